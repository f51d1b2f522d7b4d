use models::{Position, TabChar};

pub mod models;

pub trait Capitalize {
    /// Capitalize string
    fn capitalize(&self) -> String;
}

impl Capitalize for str {
    fn capitalize(&self) -> String {
        let mut chars = self.chars();
        chars.next().map_or_else(String::new, |first| {
            first.to_uppercase().chain(chars).collect()
        })
    }
}

/// Shorten the building names of the source
pub fn abbreviate_room(room: &str) -> String {
    room.replace("Academic Block", "AB")
}

/// Cut a string that doesn't fit in `max` chars, ending it with `…`
pub fn etc_str(data: &str, max: usize) -> String {
    if data.chars().count() <= max {
        return data.to_owned();
    }

    let mut short: String = data.chars().take(max.saturating_sub(1)).collect();
    short.push('…');

    short
}

/// Build a horizontal line of the table.
///
/// `skip` has one entry per day column: `Some(text)` when a class spans
/// across the line, the text is then written instead of the bar.
pub fn line_table(
    cell_length_hours: usize,
    cell_length: usize,
    pos: Position,
    skip: &[Option<String>],
) -> String {
    let bar = TabChar::Bh.val().to_string();
    let hours = bar.repeat(cell_length_hours);
    let spanned = |i: usize| skip.get(i).is_some_and(Option::is_some);

    let mut line = String::new();

    match pos {
        Position::Top => {
            line.push(TabChar::Jtl.val());
            line.push_str(&hours);
            for _ in 0..skip.len() {
                line.push(TabChar::Jtb.val());
                line.push_str(&bar.repeat(cell_length));
            }
            line.push(TabChar::Jtr.val());
        }
        Position::Bottom => {
            line.push(TabChar::Jbl.val());
            line.push_str(&hours);
            for _ in 0..skip.len() {
                line.push(TabChar::Jtt.val());
                line.push_str(&bar.repeat(cell_length));
            }
            line.push(TabChar::Jbr.val());
        }
        Position::Middle => {
            line.push(TabChar::Jl.val());
            line.push_str(&hours);
            for (i, text) in skip.iter().enumerate() {
                // Joint on the left of the column
                let left_is_text = i > 0 && spanned(i - 1);
                line.push(match (left_is_text, text.is_some()) {
                    (true, true) => TabChar::Bv.val(),
                    (true, false) => TabChar::Jl.val(),
                    (false, true) => TabChar::Jr.val(),
                    (false, false) => TabChar::Jm.val(),
                });

                match text {
                    Some(text) => {
                        line.push_str(&format!("{:^cell_length$}", etc_str(text, cell_length)));
                    }
                    None => line.push_str(&bar.repeat(cell_length)),
                }
            }
            line.push(if spanned(skip.len().saturating_sub(1)) {
                TabChar::Bv.val()
            } else {
                TabChar::Jr.val()
            });
        }
    }

    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strings() {
        assert_eq!("monday".capitalize(), "Monday");
        assert_eq!("".capitalize(), "");
        assert_eq!(abbreviate_room("Academic Block 3 - 201"), "AB 3 - 201");
        assert_eq!(etc_str("Linear Algebra", 8), "Linear …");
        assert_eq!(etc_str("Algebra", 8), "Algebra");
    }

    #[test]
    fn lines() {
        assert_eq!(line_table(2, 3, Position::Top, &[None, None]), "┌──┬───┬───┐");
        assert_eq!(
            line_table(2, 3, Position::Bottom, &[None, None]),
            "└──┴───┴───┘"
        );
        assert_eq!(
            line_table(2, 3, Position::Middle, &[None, None]),
            "├──┼───┼───┤"
        );
        assert_eq!(
            line_table(2, 3, Position::Middle, &[Some("AB".to_owned()), None]),
            "├──┤AB ├───┤"
        );
        assert_eq!(
            line_table(2, 3, Position::Middle, &[None, Some(String::new())]),
            "├──┼───┤   │"
        );
    }
}
