use async_trait::async_trait;

/// Sink for the status messages of one request.
///
/// Delivery failures are the implementation's problem: they are logged, never
/// propagated into the pipeline.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, text: &str);
}

/// Writes status lines to stdout, used by the one-shot CLI.
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn notify(&self, text: &str) {
        println!("{}", text);
    }
}
