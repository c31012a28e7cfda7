//! Per-frame execution state (spec §3 `Evm`/`Message`, merged): program
//! counter, stack, memory, gas, the code being run and its jump-destination
//! table. Cross-frame bookkeeping (logs, refund, accessed sets) lives in
//! [`crate::vm::Substate`] instead, so that incorporating a child frame's
//! effects into its parent (spec §4.5) never requires copying this struct's
//! bulkier fields (memory, stack).

use crate::constants::EVM_STACK_SIZE;
use crate::errors::ExceptionalHalt;
use crate::memory::Memory;
use crate::primitives::{Address, U256};
use bitvec::prelude::*;
use bytes::Bytes;

/// The EVM operand stack: at most 1024 [`U256`] words (spec §3, §8).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stack {
    values: Vec<U256>,
}

impl Stack {
    pub fn new() -> Self {
        Self { values: Vec::with_capacity(EVM_STACK_SIZE) }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn push(&mut self, value: U256) -> Result<(), ExceptionalHalt> {
        if self.values.len() >= EVM_STACK_SIZE {
            return Err(ExceptionalHalt::StackOverflow);
        }
        self.values.push(value);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<U256, ExceptionalHalt> {
        self.values.pop().ok_or(ExceptionalHalt::StackUnderflow)
    }

    /// `DUPn`: duplicate the item `depth` slots from the top (`depth` is
    /// 1-indexed, matching DUP1..DUP16).
    pub fn dup(&mut self, depth: usize) -> Result<(), ExceptionalHalt> {
        let len = self.values.len();
        let index = len.checked_sub(depth).ok_or(ExceptionalHalt::StackUnderflow)?;
        #[allow(clippy::indexing_slicing)]
        let value = self.values[index];
        self.push(value)
    }

    /// `SWAPn`: swap the top with the item `depth` slots down (`depth` is
    /// 1-indexed, matching SWAP1..SWAP16).
    pub fn swap(&mut self, depth: usize) -> Result<(), ExceptionalHalt> {
        let len = self.values.len();
        let index = len
            .checked_sub(depth + 1)
            .ok_or(ExceptionalHalt::StackUnderflow)?;
        let top = len - 1;
        self.values.swap(top, index);
        Ok(())
    }

    pub fn peek(&self) -> Result<U256, ExceptionalHalt> {
        self.values.last().copied().ok_or(ExceptionalHalt::StackUnderflow)
    }

    /// Bottom-to-top snapshot, for tracing (spec §6) — never called from the
    /// hot opcode path.
    pub fn values(&self) -> &[U256] {
        &self.values
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

/// Scan `code` once, marking every offset that is a valid `JUMPDEST`
/// target: the byte at that offset is `0x5B` and it is not inside the
/// immediate operand of a preceding `PUSHn` (spec §4.5, §8). Unknown
/// opcodes never consume following bytes.
pub fn analyze_jump_destinations(code: &[u8]) -> BitVec {
    const JUMPDEST: u8 = 0x5B;
    const PUSH1: u8 = 0x60;
    const PUSH32: u8 = 0x7F;

    let mut valid = bitvec![0; code.len()];
    let mut i = 0usize;
    while i < code.len() {
        #[allow(clippy::indexing_slicing)]
        let op = code[i];
        if op == JUMPDEST {
            #[allow(clippy::indexing_slicing)]
            valid.set(i, true);
            i += 1;
        } else if (PUSH1..=PUSH32).contains(&op) {
            let push_len = usize::from(op - PUSH1 + 1);
            i += 1 + push_len;
        } else {
            i += 1;
        }
    }
    valid
}

/// Static, immutable description of a call/creation frame's origin (spec §3
/// `Message`). Kept separate from the mutable `CallFrame` execution state
/// below so the many "who is calling whom" fields are never accidentally
/// treated as something the interpreter loop mutates.
#[derive(Debug, Clone)]
pub struct FrameContext {
    pub caller: Address,
    /// The address whose storage this frame reads/writes. For DELEGATECALL
    /// this differs from `code_address`.
    pub to: Address,
    /// The address whose code is executing. Equal to `to` except for
    /// DELEGATECALL/CALLCODE.
    pub code_address: Address,
    pub value: U256,
    pub calldata: Bytes,
    pub is_static: bool,
    pub depth: usize,
    pub is_create: bool,
    pub should_transfer_value: bool,
}

/// One level of the call stack (spec §3's `Evm`/`Message`, merged into a
/// single owned struct per frame).
#[derive(Debug, Clone)]
pub struct CallFrame {
    pub ctx: FrameContext,
    pub code: Bytes,
    pub valid_jump_destinations: BitVec,
    pub pc: usize,
    pub stack: Stack,
    pub memory: Memory,
    pub gas_limit: u64,
    pub gas_remaining: u64,
    pub output: Bytes,
    pub return_data: Bytes,
}

impl CallFrame {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        caller: Address,
        to: Address,
        code_address: Address,
        code: Bytes,
        value: U256,
        calldata: Bytes,
        is_static: bool,
        gas_limit: u64,
        depth: usize,
        should_transfer_value: bool,
        is_create: bool,
    ) -> Self {
        let valid_jump_destinations = analyze_jump_destinations(&code);
        Self {
            ctx: FrameContext {
                caller,
                to,
                code_address,
                value,
                calldata,
                is_static,
                depth,
                is_create,
                should_transfer_value,
            },
            code,
            valid_jump_destinations,
            pc: 0,
            stack: Stack::new(),
            memory: Memory::new(),
            gas_limit,
            gas_remaining: gas_limit,
            output: Bytes::new(),
            return_data: Bytes::new(),
        }
    }

    /// Byte at the current program counter, or `None` past the end of code
    /// (treated by the interpreter as an implicit `STOP`).
    pub fn current_opcode(&self) -> Option<u8> {
        self.code.get(self.pc).copied()
    }

    pub fn is_valid_jump_destination(&self, offset: usize) -> bool {
        self.valid_jump_destinations
            .get(offset)
            .map(|bit| *bit)
            .unwrap_or(false)
    }

    pub fn charge_gas(&mut self, amount: u64) -> Result<(), ExceptionalHalt> {
        self.gas_remaining = self
            .gas_remaining
            .checked_sub(amount)
            .ok_or(ExceptionalHalt::OutOfGas)?;
        Ok(())
    }

    pub fn refund_gas(&mut self, amount: u64) {
        self.gas_remaining = self.gas_remaining.saturating_add(amount);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jumpdest_inside_push_immediate_is_not_valid() {
        // PUSH1 0x5B ; the 0x5B here is data, not an opcode.
        let code = [0x60, 0x5B];
        let valid = analyze_jump_destinations(&code);
        assert!(!*valid.get(1).unwrap());
    }

    #[test]
    fn jumpdest_after_push_is_valid() {
        // PUSH1 0x00 ; JUMPDEST
        let code = [0x60, 0x00, 0x5B];
        let valid = analyze_jump_destinations(&code);
        assert!(*valid.get(2).unwrap());
    }

    #[test]
    fn stack_overflow_past_1024_entries() {
        let mut stack = Stack::new();
        for _ in 0..EVM_STACK_SIZE {
            stack.push(U256::zero()).unwrap();
        }
        assert_eq!(stack.push(U256::zero()), Err(ExceptionalHalt::StackOverflow));
    }

    #[test]
    fn dup_and_swap_are_one_indexed_from_the_top() {
        let mut stack = Stack::new();
        stack.push(U256::from(1)).unwrap();
        stack.push(U256::from(2)).unwrap();
        stack.dup(2).unwrap(); // duplicate the 1
        assert_eq!(stack.pop().unwrap(), U256::from(1));
        stack.swap(1).unwrap();
        assert_eq!(stack.pop().unwrap(), U256::from(1));
    }
}
