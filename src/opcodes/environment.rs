//! Block- and transaction-environment opcodes (spec §4.5): `ADDRESS`..
//! `BLOBBASEFEE`, plus `KECCAK256` (grouped here since it reads frame
//! memory like the other environment-flavoured opcodes rather than the
//! arithmetic/bitwise ones).

use super::OpcodeResult;
use crate::errors::{ExceptionalHalt, VMError};
use crate::gas_cost;
use crate::primitives::{U256, word_to_address};
use crate::vm::VM;
use sha3::{Digest, Keccak256};

fn to_usize(value: U256) -> Result<usize, VMError> {
    value
        .try_into()
        .map_err(|_| VMError::from(ExceptionalHalt::OutOfBoundsRead))
}

pub fn op_keccak256(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    let offset = to_usize(vm.pop()?)?;
    let size = to_usize(vm.pop()?)?;
    vm.charge(gas_cost::keccak256_cost(size))?;
    vm.expand_memory(&[(offset, size)])?;
    let data = vm.current_call_frame_mut()?.memory.load_range(offset, size);
    let hash = Keccak256::digest(&data);
    vm.push(U256::from_big_endian(&hash))?;
    Ok(OpcodeResult::Continue)
}

pub fn op_address(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::BASE)?;
    let address = vm.ctx()?.to;
    vm.push(U256::from_big_endian(address.as_bytes()))?;
    Ok(OpcodeResult::Continue)
}

pub fn op_balance(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    let address = word_to_address(vm.pop()?);
    vm.charge_account_access(address)?;
    let balance = vm.db.get_account(address)?.balance;
    vm.push(balance)?;
    Ok(OpcodeResult::Continue)
}

pub fn op_origin(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::BASE)?;
    let origin = vm.env.origin;
    vm.push(U256::from_big_endian(origin.as_bytes()))?;
    Ok(OpcodeResult::Continue)
}

pub fn op_caller(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::BASE)?;
    let caller = vm.ctx()?.caller;
    vm.push(U256::from_big_endian(caller.as_bytes()))?;
    Ok(OpcodeResult::Continue)
}

pub fn op_callvalue(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::BASE)?;
    let value = vm.ctx()?.value;
    vm.push(value)?;
    Ok(OpcodeResult::Continue)
}

pub fn op_calldataload(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::VERY_LOW)?;
    let offset = vm.pop()?;
    let calldata = vm.ctx()?.calldata.clone();
    let offset: usize = offset.try_into().unwrap_or(calldata.len());
    let mut buf = [0u8; 32];
    for (i, slot) in buf.iter_mut().enumerate() {
        if let Some(byte) = calldata.get(offset.saturating_add(i)) {
            *slot = *byte;
        }
    }
    vm.push(U256::from_big_endian(&buf))?;
    Ok(OpcodeResult::Continue)
}

pub fn op_calldatasize(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::BASE)?;
    let len = vm.ctx()?.calldata.len();
    vm.push(U256::from(len))?;
    Ok(OpcodeResult::Continue)
}

pub fn op_calldatacopy(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    let dest_offset = to_usize(vm.pop()?)?;
    let data_offset = vm.pop()?;
    let size = to_usize(vm.pop()?)?;
    vm.charge(gas_cost::VERY_LOW)?;
    vm.charge(gas_cost::copy_cost(size))?;
    vm.expand_memory(&[(dest_offset, size)])?;
    let calldata = vm.ctx()?.calldata.clone();
    let data_offset: usize = data_offset.try_into().unwrap_or(calldata.len());
    let mut buf = vec![0u8; size];
    for (i, slot) in buf.iter_mut().enumerate() {
        if let Some(byte) = calldata.get(data_offset.saturating_add(i)) {
            *slot = *byte;
        }
    }
    vm.current_call_frame_mut()?.memory.store_range(dest_offset, &buf);
    Ok(OpcodeResult::Continue)
}

pub fn op_codesize(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::BASE)?;
    let len = vm.current_call_frame()?.code.len();
    vm.push(U256::from(len))?;
    Ok(OpcodeResult::Continue)
}

pub fn op_codecopy(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    let dest_offset = to_usize(vm.pop()?)?;
    let code_offset = vm.pop()?;
    let size = to_usize(vm.pop()?)?;
    vm.charge(gas_cost::VERY_LOW)?;
    vm.charge(gas_cost::copy_cost(size))?;
    vm.expand_memory(&[(dest_offset, size)])?;
    let code = vm.current_call_frame()?.code.clone();
    let code_offset: usize = code_offset.try_into().unwrap_or(code.len());
    let mut buf = vec![0u8; size];
    for (i, slot) in buf.iter_mut().enumerate() {
        if let Some(byte) = code.get(code_offset.saturating_add(i)) {
            *slot = *byte;
        }
    }
    vm.current_call_frame_mut()?.memory.store_range(dest_offset, &buf);
    Ok(OpcodeResult::Continue)
}

pub fn op_gasprice(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::BASE)?;
    let gas_price = vm.env.gas_price;
    vm.push(gas_price)?;
    Ok(OpcodeResult::Continue)
}

pub fn op_extcodesize(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    let address = word_to_address(vm.pop()?);
    vm.charge_account_access(address)?;
    let info = vm.db.get_account(address)?;
    vm.push(U256::from(info.code.len()))?;
    Ok(OpcodeResult::Continue)
}

pub fn op_extcodecopy(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    let address = word_to_address(vm.pop()?);
    let dest_offset = to_usize(vm.pop()?)?;
    let code_offset = vm.pop()?;
    let size = to_usize(vm.pop()?)?;
    vm.charge_account_access(address)?;
    vm.charge(gas_cost::copy_cost(size))?;
    vm.expand_memory(&[(dest_offset, size)])?;
    let code = vm.db.get_account(address)?.code;
    let code_offset: usize = code_offset.try_into().unwrap_or(code.len());
    let mut buf = vec![0u8; size];
    for (i, slot) in buf.iter_mut().enumerate() {
        if let Some(byte) = code.get(code_offset.saturating_add(i)) {
            *slot = *byte;
        }
    }
    vm.current_call_frame_mut()?.memory.store_range(dest_offset, &buf);
    Ok(OpcodeResult::Continue)
}

pub fn op_returndatasize(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::BASE)?;
    let len = vm.current_call_frame()?.return_data.len();
    vm.push(U256::from(len))?;
    Ok(OpcodeResult::Continue)
}

pub fn op_returndatacopy(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    let dest_offset = to_usize(vm.pop()?)?;
    let data_offset = to_usize(vm.pop()?)?;
    let size = to_usize(vm.pop()?)?;
    vm.charge(gas_cost::VERY_LOW)?;
    vm.charge(gas_cost::copy_cost(size))?;
    let return_data = vm.current_call_frame()?.return_data.clone();
    let end = data_offset
        .checked_add(size)
        .ok_or(ExceptionalHalt::OutOfBoundsRead)?;
    if end > return_data.len() {
        return Err(ExceptionalHalt::OutOfBoundsRead.into());
    }
    vm.expand_memory(&[(dest_offset, size)])?;
    #[allow(clippy::indexing_slicing)]
    let slice = &return_data[data_offset..end];
    vm.current_call_frame_mut()?.memory.store_range(dest_offset, slice);
    Ok(OpcodeResult::Continue)
}

pub fn op_extcodehash(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    let address = word_to_address(vm.pop()?);
    vm.charge_account_access(address)?;
    let exists = vm.db.account_exists(address)?;
    if !exists {
        vm.push(U256::zero())?;
        return Ok(OpcodeResult::Continue);
    }
    let info = vm.db.get_account(address)?;
    if info.is_empty() {
        vm.push(U256::zero())?;
        return Ok(OpcodeResult::Continue);
    }
    let hash = Keccak256::digest(&info.code);
    vm.push(U256::from_big_endian(&hash))?;
    Ok(OpcodeResult::Continue)
}

pub fn op_blockhash(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::BLAKE2_PER_ROUND * 20)?; // BLOCKHASH flat cost == 20
    let number = vm.pop()?;
    let number: u64 = number.try_into().unwrap_or(u64::MAX);
    let hash = vm
        .env
        .block_hashes
        .get(number)
        .unwrap_or_else(crate::primitives::H256::zero);
    vm.push(U256::from_big_endian(hash.as_bytes()))?;
    Ok(OpcodeResult::Continue)
}

pub fn op_coinbase(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::BASE)?;
    let coinbase = vm.env.coinbase;
    vm.push(U256::from_big_endian(coinbase.as_bytes()))?;
    Ok(OpcodeResult::Continue)
}

pub fn op_timestamp(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::BASE)?;
    let time = vm.env.time;
    vm.push(U256::from(time))?;
    Ok(OpcodeResult::Continue)
}

pub fn op_number(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::BASE)?;
    let number = vm.env.number;
    vm.push(U256::from(number))?;
    Ok(OpcodeResult::Continue)
}

/// `DIFFICULTY`/`PREVRANDAO` (EIP-4399): the field is reinterpreted as the
/// beacon chain's `prev_randao` from Paris onward, same opcode byte.
pub fn op_difficulty(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::BASE)?;
    let value = if vm.env.config.fork.eip(crate::fork::eips::EIP_4399) {
        vm.env
            .prev_randao
            .map(|h| U256::from_big_endian(h.as_bytes()))
            .unwrap_or_default()
    } else {
        vm.env.difficulty
    };
    vm.push(value)?;
    Ok(OpcodeResult::Continue)
}

pub fn op_gaslimit(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::BASE)?;
    let limit = vm.env.block_gas_limit;
    vm.push(U256::from(limit))?;
    Ok(OpcodeResult::Continue)
}

pub fn op_chainid(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::BASE)?;
    let chain_id = vm.env.chain_id;
    vm.push(U256::from(chain_id))?;
    Ok(OpcodeResult::Continue)
}

pub fn op_selfbalance(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::WARM_ACCESS)?;
    let address = vm.ctx()?.to;
    let balance = vm.db.get_account(address)?.balance;
    vm.push(balance)?;
    Ok(OpcodeResult::Continue)
}

pub fn op_basefee(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::BASE)?;
    let base_fee = vm.env.base_fee_per_gas.unwrap_or_default();
    vm.push(base_fee)?;
    Ok(OpcodeResult::Continue)
}

/// `BLOBHASH` (EIP-4844): the `index`-th versioned hash the transaction
/// carries, or zero if out of range.
pub fn op_blobhash(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::VERY_LOW)?;
    let index = vm.pop()?;
    let index: usize = index.try_into().unwrap_or(usize::MAX);
    let value = vm
        .env
        .blob_versioned_hashes
        .get(index)
        .map(|h| U256::from_big_endian(h.as_bytes()))
        .unwrap_or_default();
    vm.push(value)?;
    Ok(OpcodeResult::Continue)
}

pub fn op_blobbasefee(vm: &mut VM) -> Result<OpcodeResult, VMError> {
    vm.charge(gas_cost::BASE)?;
    let excess = vm.env.excess_blob_gas.unwrap_or(0);
    let price = gas_cost::blob_gas_price(excess);
    vm.push(price)?;
    Ok(OpcodeResult::Continue)
}
