//! Extension points around the publish loop.
use crate::frame::Frame;
use anyhow::Result;

/// Callbacks the bot runs at fixed points, in registration order.
///
/// Every method defaults to doing nothing. An error from any hook stops the
/// bot.
pub trait LifecycleHook {
    fn name(&self) -> &'static str;

    fn before_upload_loop(&mut self) -> Result<()> {
        Ok(())
    }

    fn after_upload_loop(&mut self) -> Result<()> {
        Ok(())
    }

    fn before_frame_upload(&mut self, _frame: &Frame) -> Result<()> {
        Ok(())
    }

    /// `frame` is already posted and carries its remote identifiers.
    fn after_frame_upload(&mut self, _frame: &Frame) -> Result<()> {
        Ok(())
    }
}
