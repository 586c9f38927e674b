//! User-facing notification display and link opening.

use std::io::IsTerminal;
use tokio::sync::oneshot;

use crate::status::NotificationKind;

/// Display boundary for user notifications.
///
/// `show` issues the request and returns immediately; the receiver resolves
/// with the label of the action the user picked, or `None` if they dismissed
/// it. A dropped sender means the display ended without a response.
pub trait Notifier: Send + Sync {
    fn show(
        &self,
        kind: NotificationKind,
        message: &str,
        actions: &[String],
    ) -> oneshot::Receiver<Option<String>>;
}

/// Opens URLs in an external viewer.
pub trait LinkOpener: Send + Sync {
    fn open(&self, url: &str) -> std::io::Result<()>;
}

/// Opens links with the platform's default browser.
pub struct SystemOpener;

impl LinkOpener for SystemOpener {
    fn open(&self, url: &str) -> std::io::Result<()> {
        open::that_detached(url)
    }
}

/// Prints notifications to stdout. When actions are offered and stdin is a
/// terminal, the next line typed is taken as the user's choice.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn show(
        &self,
        kind: NotificationKind,
        message: &str,
        actions: &[String],
    ) -> oneshot::Receiver<Option<String>> {
        let (tx, rx) = oneshot::channel();

        let tag = match kind {
            NotificationKind::Info => "info",
            NotificationKind::Error => "error",
        };
        println!("[{tag}] {message}");

        if actions.is_empty() || !std::io::stdin().is_terminal() {
            let _ = tx.send(None);
            return rx;
        }

        let labels = actions
            .iter()
            .map(|a| format!("[{a}]"))
            .collect::<Vec<_>>()
            .join(" ");
        println!("       {labels}  (type an action, or press Enter to dismiss)");

        // A plain thread: a pending stdin read must never hold up runtime shutdown.
        let actions = actions.to_vec();
        std::thread::spawn(move || {
            let mut line = String::new();
            let choice = match std::io::stdin().read_line(&mut line) {
                Ok(_) => match_selection(&line, &actions),
                Err(e) => {
                    tracing::debug!(error = %e, "Failed to read notification response");
                    None
                }
            };
            let _ = tx.send(choice);
        });

        rx
    }
}

/// Resolves typed input to one of `actions`, by label (ignoring case) or by
/// 1-based position.
pub fn match_selection(input: &str, actions: &[String]) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if let Ok(n) = input.parse::<usize>() {
        return n.checked_sub(1).and_then(|i| actions.get(i)).cloned();
    }
    actions
        .iter()
        .find(|a| a.eq_ignore_ascii_case(input))
        .cloned()
}


#[cfg(test)]
mod tests {
    use super::*;

    fn actions() -> Vec<String> {
        vec!["Learn More".to_string(), "Later".to_string()]
    }

    #[test]
    fn match_selection_by_label_ignores_case_and_whitespace() {
        assert_eq!(
            match_selection("  learn more\n", &actions()).as_deref(),
            Some("Learn More")
        );
    }

    #[test]
    fn match_selection_by_position() {
        assert_eq!(match_selection("2", &actions()).as_deref(), Some("Later"));
        assert_eq!(match_selection("0", &actions()), None);
        assert_eq!(match_selection("3", &actions()), None);
    }

    #[test]
    fn match_selection_empty_input_dismisses() {
        assert_eq!(match_selection("\n", &actions()), None);
    }

    #[test]
    fn match_selection_unknown_label_is_none() {
        assert_eq!(match_selection("close", &actions()), None);
    }

    #[tokio::test]
    async fn console_notifier_without_actions_resolves_to_none() {
        let rx = ConsoleNotifier.show(NotificationKind::Error, "boom", &[]);
        assert_eq!(rx.await.unwrap(), None);
    }
}
