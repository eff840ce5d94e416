//! where chat and voice notices go
#[cfg(test)]
use mockall::automock;

/// Receives already localized sentences.  Implementations must not block
/// for long, they are called from the scheduler's supervisor thread.
#[cfg_attr(test, automock)]
pub trait Notifier: Send + Sync {
    fn send_message(&self, text: &str);
    fn send_voice_message(&self, text: &str);
}

/// prints notices to stdout
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn send_message(&self, text: &str) {
        println!("[chat] {}", text);
    }
    fn send_voice_message(&self, text: &str) {
        println!("[voice] {}", text);
    }
}

/// drop a `@host` suffix so the speech engine reads the name only
pub fn voice_name(name: &str) -> &str {
    match name.find('@') {
        Some(pos) => &name[..pos],
        None => name,
    }
}

#[cfg(test)]
mod test_notifier {
    use super::*;

    #[test]
    fn strips_host() {
        assert_eq!(voice_name("alice@jam.example.org"), "alice");
        assert_eq!(voice_name("bob"), "bob");
        assert_eq!(voice_name("@x"), "");
    }
}
