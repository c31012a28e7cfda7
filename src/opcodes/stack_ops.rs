//! Stack opcodes (spec §4.5): `POP`, `PUSHn`, `DUPn`, `SWAPn`.

use super::{OpcodeFn, OpcodeResult};
use crate::errors::VMError;
use crate::gas_cost;
use crate::primitives::U256;
use crate::vm::VM;

pub fn op_pop(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::BASE)?;
    vm.pop()?;
    Ok(OpcodeResult::Continue)
}

pub fn op_push0(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::BASE)?;
    vm.push(U256::zero())?;
    Ok(OpcodeResult::Continue)
}

/// `PUSHn` reads `n` immediate bytes following the opcode, left-padding if
/// code runs out (spec §4.5: code is conceptually zero-padded past its end).
fn push_n(vm: &mut VM, n: u8) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::VERY_LOW)?;
    let frame = vm.current_call_frame_mut()?;
    let start = frame.pc.saturating_add(1);
    let n = usize::from(n);
    let mut buf = [0u8; 32];
    for i in 0..n {
        if let Some(byte) = frame.code.get(start.saturating_add(i)) {
            #[allow(clippy::indexing_slicing)]
            {
                buf[32 - n + i] = *byte;
            }
        }
    }
    let value = U256::from_big_endian(&buf);
    frame.stack.push(value)?;
    frame.pc = start.saturating_add(n);
    Ok(OpcodeResult::Continue)
}

/// Returns a monomorphic function pointer per push width; the table needs
/// `fn(&mut VM) -> _`, not a closure, so each width gets its own tiny
/// top-level-shaped function via this generator.
pub fn push_handler(n: u8) -> OpcodeFn {
    match n {
        1 => |vm| push_n(vm, 1),
        2 => |vm| push_n(vm, 2),
        3 => |vm| push_n(vm, 3),
        4 => |vm| push_n(vm, 4),
        5 => |vm| push_n(vm, 5),
        6 => |vm| push_n(vm, 6),
        7 => |vm| push_n(vm, 7),
        8 => |vm| push_n(vm, 8),
        9 => |vm| push_n(vm, 9),
        10 => |vm| push_n(vm, 10),
        11 => |vm| push_n(vm, 11),
        12 => |vm| push_n(vm, 12),
        13 => |vm| push_n(vm, 13),
        14 => |vm| push_n(vm, 14),
        15 => |vm| push_n(vm, 15),
        16 => |vm| push_n(vm, 16),
        17 => |vm| push_n(vm, 17),
        18 => |vm| push_n(vm, 18),
        19 => |vm| push_n(vm, 19),
        20 => |vm| push_n(vm, 20),
        21 => |vm| push_n(vm, 21),
        22 => |vm| push_n(vm, 22),
        23 => |vm| push_n(vm, 23),
        24 => |vm| push_n(vm, 24),
        25 => |vm| push_n(vm, 25),
        26 => |vm| push_n(vm, 26),
        27 => |vm| push_n(vm, 27),
        28 => |vm| push_n(vm, 28),
        29 => |vm| push_n(vm, 29),
        30 => |vm| push_n(vm, 30),
        31 => |vm| push_n(vm, 31),
        _ => |vm| push_n(vm, 32),
    }
}

fn dup_n(vm: &mut VM, depth: usize) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::VERY_LOW)?;
    vm.current_call_frame_mut()?.stack.dup(depth)?;
    Ok(OpcodeResult::Continue)
}

fn swap_n(vm: &mut VM, depth: usize) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::VERY_LOW)?;
    vm.current_call_frame_mut()?.stack.swap(depth)?;
    Ok(OpcodeResult::Continue)
}

macro_rules! depth_handler_table {
    ($fn_name:ident, $inner:ident) => {
        pub fn $fn_name(depth: u8) -> OpcodeFn {
            match depth {
                1 => |vm| $inner(vm, 1),
                2 => |vm| $inner(vm, 2),
                3 => |vm| $inner(vm, 3),
                4 => |vm| $inner(vm, 4),
                5 => |vm| $inner(vm, 5),
                6 => |vm| $inner(vm, 6),
                7 => |vm| $inner(vm, 7),
                8 => |vm| $inner(vm, 8),
                9 => |vm| $inner(vm, 9),
                10 => |vm| $inner(vm, 10),
                11 => |vm| $inner(vm, 11),
                12 => |vm| $inner(vm, 12),
                13 => |vm| $inner(vm, 13),
                14 => |vm| $inner(vm, 14),
                15 => |vm| $inner(vm, 15),
                _ => |vm| $inner(vm, 16),
            }
        }
    };
}

depth_handler_table!(dup_handler, dup_n);
depth_handler_table!(swap_handler, swap_n);
