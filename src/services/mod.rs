/// Random two-round board assembly.
pub mod board_assembler;
/// Handler context and outbound delivery seam.
pub mod context;
/// OpenAPI documentation generation.
pub mod documentation;
/// Single-writer engine and its command dispatcher.
pub mod engine;
/// Clue flow and timeout cascade.
pub mod gameplay;
/// Health check service.
pub mod health_service;
/// Session membership and connection lifecycle.
pub mod lobby;
/// Answer grading and score tally.
pub mod scoring;
/// Read-only session projections.
pub mod session_service;
#[cfg(test)]
pub(crate) mod test_support;
/// WebSocket connection and message handling service.
pub mod websocket_service;
