use futures::executor::block_on;
use futures::future::{join_all, LocalBoxFuture};

use error::RenderError;

/// A single queued item: literal text, or a subcomputation enqueued at a
/// section boundary that will itself produce a [`FutureWriter`].
enum WriteItem {
    Text(String),
    Deferred(LocalBoxFuture<'static, Result<FutureWriter, RenderError>>),
}

/// A streaming writer that accepts literal text and deferred
/// subcomputations, flushing them in enqueue order.
///
/// Entering a section pushes a fresh child `FutureWriter`; its eventual
/// output is enqueued into the parent at the position the section occupied,
/// so document order survives even though the child may be evaluated later
/// (and, via `join_all` below, concurrently with its siblings).
#[derive(Default)]
pub struct FutureWriter {
    items: Vec<WriteItem>,
}

impl FutureWriter {
    pub fn new() -> Self {
        FutureWriter { items: Vec::new() }
    }

    /// Appends literal text, coalescing with the previous item when it is
    /// also literal text.
    pub fn write<S: Into<String>>(&mut self, text: S) {
        let text = text.into();
        if let Some(&mut WriteItem::Text(ref mut last)) = self.items.last_mut() {
            last.push_str(&text);
            return;
        }
        self.items.push(WriteItem::Text(text));
    }

    /// Enqueues a subcomputation at the current position in the stream.
    pub fn enqueue(&mut self, future: LocalBoxFuture<'static, Result<FutureWriter, RenderError>>) {
        self.items.push(WriteItem::Deferred(future));
    }

    /// Drains the queue in enqueue order, concatenating literal text with
    /// the flushed output of each deferred subcomputation. Deferred items
    /// are evaluated concurrently via `join_all`; their results are then
    /// spliced back in at their original queue position, so ordering never
    /// depends on completion order.
    pub fn flush(self) -> Result<String, RenderError> {
        let mut slots: Vec<Option<String>> = Vec::with_capacity(self.items.len());
        let mut pending = Vec::new();

        for item in self.items {
            match item {
                WriteItem::Text(text) => slots.push(Some(text)),
                WriteItem::Deferred(future) => {
                    let index = slots.len();
                    slots.push(None);
                    pending.push(async move { (index, future.await) });
                }
            }
        }

        let resolved = block_on(join_all(pending));
        for (index, result) in resolved {
            let writer = result?;
            slots[index] = Some(writer.flush()?);
        }

        Ok(slots.into_iter().map(|slot| slot.unwrap_or_default()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::FutureExt;

    #[test]
    fn flush_concatenates_in_order() {
        let mut writer = FutureWriter::new();
        writer.write("a");
        writer.enqueue(
            async {
                let mut child = FutureWriter::new();
                child.write("b");
                Ok(child)
            }
            .boxed_local(),
        );
        writer.write("c");
        assert_eq!("abc", writer.flush().unwrap());
    }

    #[test]
    fn adjacent_text_coalesces() {
        let mut writer = FutureWriter::new();
        writer.write("a");
        writer.write("b");
        assert_eq!(1, writer.items.len());
        assert_eq!("ab", writer.flush().unwrap());
    }

    #[test]
    fn nested_deferred_preserves_order() {
        let mut writer = FutureWriter::new();
        for label in &["1", "2", "3"] {
            let label = label.to_string();
            writer.enqueue(
                async move {
                    let mut child = FutureWriter::new();
                    child.write(label);
                    Ok(child)
                }
                .boxed_local(),
            );
        }
        assert_eq!("123", writer.flush().unwrap());
    }
}
