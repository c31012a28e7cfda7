//! `LOGn` opcodes (spec §4.5): emit an event with `n` indexed topics.

use super::{OpcodeFn, OpcodeResult};
use crate::errors::{ExceptionalHalt, VMError};
use crate::gas_cost;
use crate::vm::{Log, VM};

fn log_n(vm: &mut VM, topic_count: u8) -> Result<OpcodeResult, VMError> {
    if vm.ctx()?.is_static {
        return Err(ExceptionalHalt::WriteInStaticContext.into());
    }
    let offset: usize = vm
        .pop()?
        .try_into()
        .map_err(|_| VMError::from(ExceptionalHalt::OutOfBoundsRead))?;
    let size: usize = vm
        .pop()?
        .try_into()
        .map_err(|_| VMError::from(ExceptionalHalt::OutOfBoundsRead))?;
    let mut topics = Vec::with_capacity(usize::from(topic_count));
    for _ in 0..topic_count {
        let word = vm.pop()?;
        let mut bytes = [0u8; 32];
        word.to_big_endian(&mut bytes);
        topics.push(crate::primitives::H256::from(bytes));
    }

    vm.charge(gas_cost::log_cost(
        u64::from(topic_count),
        u64::try_from(size).unwrap_or(u64::MAX),
    ))?;
    vm.expand_memory(&[(offset, size)])?;
    let data = vm.current_call_frame_mut()?.memory.load_range(offset, size);
    let address = vm.ctx()?.to;
    vm.substate.add_log(Log { address, topics, data });
    Ok(OpcodeResult::Continue)
}

pub fn log_handler(n: u8) -> OpcodeFn {
    match n {
        0 => |vm| log_n(vm, 0),
        1 => |vm| log_n(vm, 1),
        2 => |vm| log_n(vm, 2),
        3 => |vm| log_n(vm, 3),
        _ => |vm| log_n(vm, 4),
    }
}
