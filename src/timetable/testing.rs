//! Local stand-in for the remote timetable source

use std::{collections::HashMap, sync::Arc};

use axum::{extract::Path, http::StatusCode, routing::get, Json, Router};
use serde_json::json;
use tokio::net::TcpListener;

use crate::config::Config;

const WRAPPER: &str = "/*O_o*/\ngoogle.visualization.Query.setResponse";

/// Sheet with a single class on its first slot
pub fn one_class(cell: &str) -> String {
    let json = json!({"table": {"rows": [
        {"c": [{"v": "Rooms"}]},
        {"c": [{"v": "Room"}, {"v": "8:00-8:50"}, {"v": "9:00-9:50"}]},
        {"c": [{"v": "Academic Block 1"}, {"v": cell}, null]},
    ]}});

    format!("{WRAPPER}({json});")
}

/// Serve the metadata and one sheet per `(day, status, body)`
pub async fn source(sheets: Vec<(&str, u16, String)>) -> Config {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    let codes: Vec<_> = sheets
        .iter()
        .enumerate()
        .map(|(gid, (name, ..))| json!({"name": name, "gid": gid.to_string()}))
        .collect();
    let metadata = json!({"karachi": {"url": format!("{base}/sheets/"), "codes": codes}});

    let bodies: Arc<HashMap<String, (u16, String)>> = Arc::new(
        sheets
            .into_iter()
            .enumerate()
            .map(|(gid, (_, status, body))| (gid.to_string(), (status, body)))
            .collect(),
    );

    let router = Router::new()
        .route(
            "/api/data",
            get(move || {
                let metadata = metadata.clone();
                async move { Json(metadata) }
            }),
        )
        .route(
            "/sheets/:gid",
            get(move |Path(gid): Path<String>| {
                let bodies = bodies.clone();
                async move {
                    match bodies.get(&gid) {
                        Some((status, body)) => {
                            (StatusCode::from_u16(*status).unwrap(), body.clone())
                        }
                        None => (StatusCode::NOT_FOUND, String::new()),
                    }
                }
            }),
        );

    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });

    Config::new(format!("{base}/api/data"))
}

