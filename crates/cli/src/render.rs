//! Terminal rendering of per-source recommendation panels.

use colored::Colorize;
use orchestrator::{NOT_FOUND_MESSAGE, Recommendation, Snapshot};
use serde_json::Value;
use sources::SourceId;

/// What a panel shows for one source
#[derive(Debug, PartialEq)]
pub enum PanelBody<'a> {
    Loading,
    Error(&'a str),
    Empty,
    Items(Vec<String>),
}

/// Panel header, e.g. "Collaborative Model"
pub fn panel_title(source: SourceId) -> String {
    let name = source.as_str();
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => format!("{}{} Model", first.to_uppercase(), chars.as_str()),
        None => "Model".to_string(),
    }
}

/// Strings print bare; anything else prints as compact JSON
pub fn item_text(item: &Value) -> String {
    match item {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn panel_body(loading: bool, recommendation: &Recommendation<Value>) -> PanelBody<'_> {
    if loading {
        PanelBody::Loading
    } else if recommendation.is_error() {
        PanelBody::Error(recommendation.error())
    } else if recommendation.data().is_empty() {
        PanelBody::Empty
    } else {
        PanelBody::Items(recommendation.data().iter().map(item_text).collect())
    }
}

pub fn print_panel(source: SourceId, loading: bool, recommendation: &Recommendation<Value>) {
    println!("{}", panel_title(source).bold().blue());
    match panel_body(loading, recommendation) {
        PanelBody::Loading => println!("  {}", "Loading...".yellow()),
        PanelBody::Error(message) => println!("  {}", message.red()),
        PanelBody::Empty => println!("  {}", NOT_FOUND_MESSAGE),
        PanelBody::Items(items) => {
            for (i, item) in items.iter().enumerate() {
                println!("  {}. {}", (i + 1).to_string().green(), item);
            }
        }
    }
}

/// One panel per configured source, in source order
pub fn print_snapshot(snapshot: &Snapshot<Value>) {
    for (source, recommendation) in snapshot.recommendations() {
        print_panel(*source, snapshot.is_loading(*source), recommendation);
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_panel_title() {
        assert_eq!(panel_title(SourceId::Collaborative), "Collaborative Model");
        assert_eq!(panel_title(SourceId::Azure), "Azure Model");
    }

    #[test]
    fn test_item_text() {
        assert_eq!(item_text(&json!("1234")), "1234");
        assert_eq!(item_text(&json!(7)), "7");
        assert_eq!(item_text(&json!({"id": 1})), r#"{"id":1}"#);
    }

    #[test]
    fn test_panel_body_precedence() {
        let failed = Recommendation::failure("Error fetching data");
        assert_eq!(panel_body(true, &failed), PanelBody::Loading);
        assert_eq!(panel_body(false, &failed), PanelBody::Error("Error fetching data"));

        let empty = Recommendation::success(vec![]);
        assert_eq!(panel_body(false, &empty), PanelBody::Empty);

        let items = Recommendation::success(vec![json!("a"), json!(2)]);
        assert_eq!(
            panel_body(false, &items),
            PanelBody::Items(vec!["a".to_string(), "2".to_string()])
        );
    }
}
