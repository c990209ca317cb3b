use std::future::Future;

use crate::xml::{XmlError, XmlToken, XmlWriter, write_token};

/// Async XML sink for the buffered write path.
///
/// Mapping walks are synchronous and run to completion into an
/// [`crate::xml::XmlBuffer`]; the buffered tokens are then handed to an async sink.
/// Methods are prefixed with `async_` to avoid clashing with [`XmlWriter`].
pub trait AsyncXmlSink: Send {
    fn async_write_token(&mut self, token: &XmlToken) -> impl Future<Output = Result<(), XmlError>> + Send;

    /// Batch write - default impl calls async_write_token() in sequence.
    fn async_write_tokens(
        &mut self,
        tokens: &[XmlToken],
    ) -> impl Future<Output = Result<(), XmlError>> + Send {
        let tokens = tokens.to_vec();
        async move {
            for token in &tokens {
                self.async_write_token(token).await?;
            }
            Ok(())
        }
    }

    fn async_flush(&mut self) -> impl Future<Output = Result<(), XmlError>> + Send {
        async { Ok(()) }
    }
}

/// Blanket impl: any sync `XmlWriter` is also an `AsyncXmlSink`.
impl<W: XmlWriter + Send> AsyncXmlSink for W {
    async fn async_write_token(&mut self, token: &XmlToken) -> Result<(), XmlError> {
        write_token(self, token)
    }
}
