//! Service: kelompok route yang didaftarkan bersama.

use super::router::Router;
use crate::error::RouterError;

/// A group of related routes registered together, e.g. everything under
/// `svc/world/`.
pub trait Service {
    fn register(&self, router: &mut Router) -> Result<(), RouterError>;
}
