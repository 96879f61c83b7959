//! `evm_core-levm`: the execution core's VM crate — journal, access lists,
//! gas accounting, jumpdest analysis, memory, the Call/Create Engine, the
//! opcode dispatcher, the Transaction Driver and the Top-Level Loop.

pub mod access_list;
pub mod bloom;
pub mod call_frame;
pub mod code;
pub mod driver;
pub mod engine;
pub mod errors;
pub mod gas;
pub mod journal;
pub mod jumpdest;
pub mod memory;
pub mod opcodes;
pub mod precompiles;
pub mod receipt;
pub mod substate;
pub mod transaction;

pub use access_list::AccessList;
pub use bloom::LogsBloom;
pub use call_frame::CallFrame;
pub use code::Code;
pub use driver::{run_block, BlockClaims, BlockOutcome, DriverError};
pub use engine::{
    create2_address, create_address, CallKind, CallOutcome, CreateOutcome, EngineGasMeter, FrameExit, VmState,
};
pub use errors::{InternalError, InvalidTxError, VMError};
pub use gas::{call_gas, intrinsic_gas, CallGasInputs, GasMeter};
pub use journal::{Journal, JournalEntry};
pub use precompiles::{DefaultPrecompiles, PrecompileOutcome, PrecompileProvider};
pub use receipt::Receipt;
pub use substate::Substate;
pub use transaction::TxOutcome;
