//! Opcode dispatch (spec §4.5): a 256-entry function-pointer table built
//! once per fork (REDESIGN FLAG 4, SPEC_FULL.md §6), plus the category
//! modules implementing each instruction.

mod arithmetic;
mod bitwise;
mod control_flow;
mod environment;
mod logging;
mod memory_ops;
mod stack_ops;
mod storage_ops;
pub(crate) mod system;

pub mod codes;

use crate::errors::{ExceptionalHalt, VMError};
use crate::fork::Fork;
use crate::vm::VM;
use bytes::Bytes;

/// What an opcode handler tells the interpreter loop to do next. `CREATE`/
/// `CREATE2` don't surface a variant of their own here: `create_common`
/// drives its child frame to completion and pushes the resulting address
/// itself, then reports `Continue` like any other opcode.
#[derive(Debug)]
pub enum OpcodeResult {
    /// Keep executing at the next program counter (handlers that jump set
    /// `pc` themselves and the loop detects that and doesn't re-advance it).
    Continue,
    Return(Bytes),
    Revert(Bytes),
}

pub type OpcodeFn = fn(&mut VM) -> Result<OpcodeResult, VMError>;

fn unassigned(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    let opcode = vm.current_call_frame()?.current_opcode().unwrap_or(0);
    Err(ExceptionalHalt::InvalidOpcode(opcode).into())
}

/// Build the 256-entry dispatch table for `fork`. Every unassigned slot
/// traps with `InvalidOpcode`; opcodes introduced by an EIP not yet active
/// at `fork` are left unassigned rather than wired to their future handler,
/// so running pre-fork bytecode containing them still halts correctly.
#[allow(clippy::as_conversions)]
pub fn build_opcode_table(fork: Fork) -> [OpcodeFn; 256] {
    use codes::*;

    let mut table: [OpcodeFn; 256] = [unassigned; 256];

    table[STOP as usize] = control_flow::op_stop;
    table[ADD as usize] = arithmetic::op_add;
    table[MUL as usize] = arithmetic::op_mul;
    table[SUB as usize] = arithmetic::op_sub;
    table[DIV as usize] = arithmetic::op_div;
    table[SDIV as usize] = arithmetic::op_sdiv;
    table[MOD as usize] = arithmetic::op_mod;
    table[SMOD as usize] = arithmetic::op_smod;
    table[ADDMOD as usize] = arithmetic::op_addmod;
    table[MULMOD as usize] = arithmetic::op_mulmod;
    table[EXP as usize] = arithmetic::op_exp;
    table[SIGNEXTEND as usize] = arithmetic::op_signextend;

    table[LT as usize] = bitwise::op_lt;
    table[GT as usize] = bitwise::op_gt;
    table[SLT as usize] = bitwise::op_slt;
    table[SGT as usize] = bitwise::op_sgt;
    table[EQ as usize] = bitwise::op_eq;
    table[ISZERO as usize] = bitwise::op_iszero;
    table[AND as usize] = bitwise::op_and;
    table[OR as usize] = bitwise::op_or;
    table[XOR as usize] = bitwise::op_xor;
    table[NOT as usize] = bitwise::op_not;
    table[BYTE as usize] = bitwise::op_byte;
    if fork.eip(crate::fork::eips::EIP_145) {
        table[SHL as usize] = bitwise::op_shl;
        table[SHR as usize] = bitwise::op_shr;
        table[SAR as usize] = bitwise::op_sar;
    }

    table[KECCAK256 as usize] = environment::op_keccak256;

    table[ADDRESS as usize] = environment::op_address;
    table[BALANCE as usize] = environment::op_balance;
    table[ORIGIN as usize] = environment::op_origin;
    table[CALLER as usize] = environment::op_caller;
    table[CALLVALUE as usize] = environment::op_callvalue;
    table[CALLDATALOAD as usize] = environment::op_calldataload;
    table[CALLDATASIZE as usize] = environment::op_calldatasize;
    table[CALLDATACOPY as usize] = environment::op_calldatacopy;
    table[CODESIZE as usize] = environment::op_codesize;
    table[CODECOPY as usize] = environment::op_codecopy;
    table[GASPRICE as usize] = environment::op_gasprice;
    table[EXTCODESIZE as usize] = environment::op_extcodesize;
    table[EXTCODECOPY as usize] = environment::op_extcodecopy;
    if fork.eip(crate::fork::eips::EIP_211) {
        table[RETURNDATASIZE as usize] = environment::op_returndatasize;
        table[RETURNDATACOPY as usize] = environment::op_returndatacopy;
    }
    if fork.eip(crate::fork::eips::EIP_1052) {
        table[EXTCODEHASH as usize] = environment::op_extcodehash;
    }
    table[BLOCKHASH as usize] = environment::op_blockhash;
    table[COINBASE as usize] = environment::op_coinbase;
    table[TIMESTAMP as usize] = environment::op_timestamp;
    table[NUMBER as usize] = environment::op_number;
    table[DIFFICULTY as usize] = environment::op_difficulty;
    table[GASLIMIT as usize] = environment::op_gaslimit;
    if fork.eip(crate::fork::eips::EIP_1344) {
        table[CHAINID as usize] = environment::op_chainid;
    }
    if fork.eip(crate::fork::eips::EIP_1884) {
        table[SELFBALANCE as usize] = environment::op_selfbalance;
    }
    if fork.eip(crate::fork::eips::EIP_3198) {
        table[BASEFEE as usize] = environment::op_basefee;
    }
    if fork.eip(crate::fork::eips::EIP_4844) {
        table[BLOBHASH as usize] = environment::op_blobhash;
    }
    if fork.eip(crate::fork::eips::EIP_7516) {
        table[BLOBBASEFEE as usize] = environment::op_blobbasefee;
    }

    table[POP as usize] = stack_ops::op_pop;
    table[MLOAD as usize] = memory_ops::op_mload;
    table[MSTORE as usize] = memory_ops::op_mstore;
    table[MSTORE8 as usize] = memory_ops::op_mstore8;
    table[SLOAD as usize] = storage_ops::op_sload;
    table[SSTORE as usize] = storage_ops::op_sstore;
    table[JUMP as usize] = control_flow::op_jump;
    table[JUMPI as usize] = control_flow::op_jumpi;
    table[PC as usize] = control_flow::op_pc;
    table[MSIZE as usize] = memory_ops::op_msize;
    table[GAS as usize] = control_flow::op_gas;
    table[JUMPDEST as usize] = control_flow::op_jumpdest;
    if fork.eip(crate::fork::eips::EIP_1153) {
        table[TLOAD as usize] = storage_ops::op_tload;
        table[TSTORE as usize] = storage_ops::op_tstore;
        table[MCOPY as usize] = memory_ops::op_mcopy;
    }
    if fork.eip(crate::fork::eips::EIP_3855) {
        table[PUSH0 as usize] = stack_ops::op_push0;
    }

    for n in 1u8..=32 {
        let opcode = PUSH1 + (n - 1);
        table[opcode as usize] = stack_ops::push_handler(n);
    }
    for n in 1u8..=16 {
        table[(DUP1 + (n - 1)) as usize] = stack_ops::dup_handler(n);
        table[(SWAP1 + (n - 1)) as usize] = stack_ops::swap_handler(n);
    }
    for n in 0u8..=4 {
        table[(LOG0 + n) as usize] = logging::log_handler(n);
    }

    table[CREATE as usize] = system::op_create;
    table[CALL as usize] = system::op_call;
    table[CALLCODE as usize] = system::op_callcode;
    table[RETURN as usize] = control_flow::op_return;
    if fork.eip(crate::fork::eips::EIP_7) {
        table[DELEGATECALL as usize] = system::op_delegatecall;
    }
    if fork.eip(crate::fork::eips::EIP_1014) {
        table[CREATE2 as usize] = system::op_create2;
    }
    if fork.eip(crate::fork::eips::EIP_214) {
        table[STATICCALL as usize] = system::op_staticcall;
    }
    if fork.eip(crate::fork::eips::EIP_140) {
        table[REVERT as usize] = control_flow::op_revert;
    }
    table[INVALID as usize] = control_flow::op_invalid;
    table[SELFDESTRUCT as usize] = system::op_selfdestruct;

    table
}
