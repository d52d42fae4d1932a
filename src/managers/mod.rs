// Managers Module
//
// Each manager handles one specific concern:
// - SessionManager: Test A / Test B lifecycle, results and comparison
// - BroadcastChannelManager: Tokio broadcast channel management

pub mod broadcast_manager;
pub mod session_manager;

pub use broadcast_manager::BroadcastChannelManager;
pub use session_manager::{SessionInfo, SessionManager, SlotResult, TestSlot};
