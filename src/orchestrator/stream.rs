use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::mpsc;

/// What went wrong when a [`ReplyItem::Error`] is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyErrorKind {
    /// The primary answer generation failed or timed out.
    Generation,
    /// The tone-rewrite stage failed after a complete answer existed.
    ToneRewrite,
}

/// One item of a streamed reply.
///
/// Every stream ends with exactly one `Done`, error or not; an `Error` is
/// always followed by `Done` and never by further `Delta`s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyItem {
    /// An incremental text fragment, in generation order.
    Delta(String),
    /// The exchange failed; no more deltas will follow.
    Error {
        kind: ReplyErrorKind,
        message: String,
    },
    /// End of stream.
    Done,
}

/// Consumer side of one exchange's reply.
pub struct ReplyStream {
    rx: mpsc::UnboundedReceiver<ReplyItem>,
}

impl ReplyStream {
    #[must_use]
    pub(crate) fn new(rx: mpsc::UnboundedReceiver<ReplyItem>) -> Self {
        Self { rx }
    }

    /// Next item, or `None` after `Done` has been consumed (or the producer
    /// vanished).
    pub async fn next_item(&mut self) -> Option<ReplyItem> {
        self.rx.recv().await
    }

    /// Drains the stream, concatenating deltas. Returns the assembled text
    /// and the error item, if one was emitted.
    pub async fn collect(mut self) -> (String, Option<ReplyItem>) {
        let mut text = String::new();
        let mut error = None;
        while let Some(item) = self.next_item().await {
            match item {
                ReplyItem::Delta(delta) => text.push_str(&delta),
                ReplyItem::Error { .. } => error = Some(item),
                ReplyItem::Done => break,
            }
        }
        (text, error)
    }
}

impl futures_util::Stream for ReplyStream {
    type Item = ReplyItem;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
