use std::sync::Arc;

use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};

use crate::config::Config;
use crate::timetable::{self, models::SharedSnapshot};

/// What readers of the timetable currently see
#[derive(Clone, Debug)]
pub enum State {
    Loading,
    Ready(SharedSnapshot),
    Failed(String),
}

/// Keeps the timetable up to date.
///
/// Every fetch replaces the state as a whole, concurrent fetches are not
/// deduplicated: the last one to finish wins.
pub struct Refresher {
    config: Arc<Config>,
    state: Arc<watch::Sender<State>>,
    timer: Option<JoinHandle<()>>,
}

impl Refresher {
    /// Fetch the timetable now, then every `config.refresh_every`
    pub fn start(config: Config) -> Self {
        let config = Arc::new(config);
        let (state, _) = watch::channel(State::Loading);
        let state = Arc::new(state);

        let timer = {
            let config = config.clone();
            let state = state.clone();
            tokio::spawn(async move {
                let mut ticker = interval(config.refresh_every);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    // First tick is immediate
                    ticker.tick().await;
                    tokio::spawn(run(config.clone(), state.clone()));
                }
            })
        };
        log::info!(
            "refreshing the timetable every {}s",
            config.refresh_every.as_secs()
        );

        Self {
            config,
            state,
            timer: Some(timer),
        }
    }

    /// Fetch the timetable again, i.e. on user request
    pub fn refresh(&self) -> JoinHandle<()> {
        tokio::spawn(run(self.config.clone(), self.state.clone()))
    }

    pub fn subscribe(&self) -> watch::Receiver<State> {
        self.state.subscribe()
    }

    /// Stop the automatic refreshes, fetches already started still
    /// complete
    pub fn teardown(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
            log::info!("automatic refresh stopped");
        }
    }
}

impl Drop for Refresher {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// One fetch cycle
async fn run(config: Arc<Config>, state: Arc<watch::Sender<State>>) {
    state.send_replace(State::Loading);

    let new_state = match timetable::fetch(&config).await {
        Ok(snapshot) => {
            log::info!(
                "timetable loaded: {} classes from {} sheets",
                snapshot.occurrences.len(),
                snapshot.sheets_loaded
            );
            State::Ready(Arc::new(snapshot))
        }
        Err(e) => {
            log::error!("failed to fetch or parse timetable data: {e}");
            State::Failed(e.to_string())
        }
    };

    state.send_replace(new_state);
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;
    use crate::timetable::testing::{one_class, source};

    async fn settled(rx: &mut watch::Receiver<State>) -> State {
        timeout(
            Duration::from_secs(10),
            rx.wait_for(|state| !matches!(state, State::Loading)),
        )
        .await
        .unwrap()
        .unwrap()
        .clone()
    }

    #[tokio::test]
    async fn first_fetch_then_refresh() {
        let config = source(vec![("Monday", 200, one_class("CS101(A)\nJohn Doe"))]).await;
        let refresher = Refresher::start(config);
        let mut rx = refresher.subscribe();

        let State::Ready(first) = settled(&mut rx).await else {
            panic!("timetable should be loaded");
        };
        assert_eq!(first.occurrences.len(), 1);

        refresher.refresh().await.unwrap();
        let State::Ready(second) = refresher.subscribe().borrow().clone() else {
            panic!("timetable should be reloaded");
        };
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(second.fetched_at >= first.fetched_at);
        assert_eq!(second.occurrences, first.occurrences);
    }

    #[tokio::test]
    async fn failure_is_published() {
        let config = source(vec![("Monday", 503, String::new())]).await;
        let refresher = Refresher::start(config);
        let mut rx = refresher.subscribe();

        let State::Failed(message) = settled(&mut rx).await else {
            panic!("fetch should fail");
        };
        assert!(message.contains("no timetable data could be loaded"));
    }

    #[tokio::test]
    async fn timer_refreshes_until_teardown() {
        let mut config = source(vec![("Monday", 200, one_class("CS101(A)\nJohn Doe"))]).await;
        config.refresh_every = Duration::from_millis(50);
        let mut refresher = Refresher::start(config);
        let mut rx = refresher.subscribe();

        // Loaded twice without asking
        let mut loaded = 0;
        while loaded < 2 {
            timeout(Duration::from_secs(10), rx.changed())
                .await
                .unwrap()
                .unwrap();
            if matches!(*rx.borrow_and_update(), State::Ready(_)) {
                loaded += 1;
            }
        }

        refresher.teardown();

        // Let the fetch started before the teardown finish
        tokio::time::sleep(Duration::from_millis(300)).await;
        rx.mark_unchanged();

        assert!(timeout(Duration::from_millis(500), rx.changed())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn teardown_keeps_manual_refresh() {
        let config = source(vec![("Monday", 200, one_class("CS101(A)\nJohn Doe"))]).await;
        let mut refresher = Refresher::start(config);
        let mut rx = refresher.subscribe();
        settled(&mut rx).await;

        refresher.teardown();
        assert!(refresher.timer.is_none());

        refresher.refresh().await.unwrap();
        assert!(matches!(refresher.subscribe().borrow().clone(), State::Ready(_)));
    }
}
