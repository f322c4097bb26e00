//! The sensor capability the enrollment and match logic is written against

use r503_core::constants::buffers;
use r503_types::{LedSignal, SearchHit, SlotId, SystemParameters};

use crate::error::Result;

/// Sensor-side character buffer receiving a template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharBuffer {
    One,
    Two,
}

impl From<CharBuffer> for u8 {
    fn from(buffer: CharBuffer) -> u8 {
        match buffer {
            CharBuffer::One => buffers::CHAR_BUFFER_1,
            CharBuffer::Two => buffers::CHAR_BUFFER_2,
        }
    }
}

/// Primitive sensor operations.
///
/// Every call blocks until the sensor answers. A non-OK confirmation code
/// is [`Error::Sensor`](crate::Error::Sensor); anything else is a transport
/// or framing fault.
#[cfg_attr(test, mockall::automock)]
pub trait SensorLink: Send {
    /// Take a finger image into the image buffer
    fn capture_image(&mut self) -> Result<()>;

    /// Convert the image buffer into a template in `buffer`
    fn image_to_template(&mut self, buffer: CharBuffer) -> Result<()>;

    /// Fuse both character buffers into a model
    fn create_model(&mut self) -> Result<()>;

    /// Persist the model to `slot`
    fn store_model(&mut self, slot: SlotId) -> Result<()>;

    fn delete_model(&mut self, slot: SlotId) -> Result<()>;

    /// Search the library with the template in buffer one
    fn search(&mut self) -> Result<SearchHit>;

    /// Occupied slots, ascending
    fn read_templates(&mut self) -> Result<Vec<SlotId>>;

    fn count_templates(&mut self) -> Result<u16>;

    fn set_led(&mut self, signal: LedSignal) -> Result<()>;

    /// Parameters read during connect, if any
    fn system_parameters(&self) -> Option<SystemParameters>;
}
