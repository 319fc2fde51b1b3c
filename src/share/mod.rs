//! Sharing Layer
//!
//! Everything that crosses from one device to the other. There is no
//! server: a challenge travels as a link sent by the players themselves.
//!
//! - `codec`: challenge token encode/decode
//! - `link`: link building and message text
//! - `messenger`: delivery with fallbacks

pub mod codec;
pub mod link;
pub mod messenger;

pub use codec::{decode, encode, encode_at, encode_challenge, Challenge, CodecError};
pub use link::{LinkStyle, ShareConfig, ShareMessage};
pub use messenger::{deliver, Delivery, Fallback, ManualDisplay, Messenger, MessengerError};
