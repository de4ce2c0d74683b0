//! Outward notification sink.
//!
//! The transport (chat client, mailer) lives behind this seam; the core
//! fires and forgets.

use std::path::PathBuf;

pub trait Notifier: Send + Sync {
    fn notify(&self, channel: Option<&str>, text: &str, attachments: &[(PathBuf, String)]);
}

/// Default sink that writes notifications to the log.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, channel: Option<&str>, text: &str, attachments: &[(PathBuf, String)]) {
        match channel {
            Some(channel) => tracing::info!("[{}] {}", channel, text.trim_end()),
            None => tracing::info!("{}", text.trim_end()),
        }
        for (path, title) in attachments {
            tracing::info!("attachment '{}' ({})", path.display(), title);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records every notification for assertions.
    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(Option<String>, String, usize)>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, channel: Option<&str>, text: &str, attachments: &[(PathBuf, String)]) {
            self.sent.lock().unwrap().push((
                channel.map(str::to_string),
                text.to_string(),
                attachments.len(),
            ));
        }
    }

    #[test]
    fn test_notify_through_trait_object() {
        let recorder = RecordingNotifier::default();
        let sink: &dyn Notifier = &recorder;
        sink.notify(Some("ops"), "host is down: 500\n", &[]);
        sink.notify(None, "ping statistics", &[(PathBuf::from("/tmp/icmp_0.png"), "all".into())]);

        let sent = recorder.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], (Some("ops".to_string()), "host is down: 500\n".to_string(), 0));
        assert_eq!(sent[1].2, 1);
    }
}
