//! Tests against a real controller.
//!
//! Set `TEST_PORT` to the device path (e.g. `/dev/tty.usbmodem1411`).
//! Tests skip themselves when it is unset.
