//! The interpreter core (spec §4.5): [`Substate`] (cross-frame journal of
//! accessed sets, logs and refund) and [`VM`] (the call-frame stack plus the
//! opcode dispatch loop). Named and shaped after `ethrex_levm::vm::VM` /
//! `Substate`, with `parent_evm` replaced by a flat `call_frames: Vec<CallFrame>`
//! per the adopted redesign flag (SPEC_FULL.md §6.3).

use crate::account::AccountInfo;
use crate::call_frame::{CallFrame, FrameContext};
use crate::constants::{
    INVALID_CONTRACT_PREFIX, MAX_CODE_SIZE, STACK_DEPTH_LIMIT, YIELD_EVERY_N_STEPS,
};
use crate::db::GeneralizedDatabase;
use crate::environment::Environment;
use crate::errors::{ExceptionalHalt, InternalError, VMError};
use crate::fork::eips;
use crate::gas_cost;
use crate::hooks::Hook;
use crate::opcodes::{self, OpcodeResult};
use crate::primitives::{Address, H256, U256};
use bytes::Bytes;
use rustc_hash::{FxHashMap, FxHashSet};

/// One EVM log entry (spec §3, §4.5 `LOGn`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<H256>,
    pub data: Bytes,
}

/// What one call-frame backup of [`Substate`] needs to restore on revert.
/// Accessed-address/storage-key warmth is deliberately **not** part of this
/// backup: EIP-2929 warmth survives a reverted sub-call (the access itself
/// already happened and was paid for), matching `Substate::push_backup` in
/// the teacher.
#[derive(Debug, Default)]
struct SubstateBackup {
    selfdestruct_set: FxHashSet<Address>,
    touched_accounts: FxHashSet<Address>,
    log_count: usize,
    refunded_gas: i64,
}

/// Cross-frame journal (spec §4.5): accessed-address/storage-key sets
/// (EIP-2929 warmth), the self-destruct set, emitted logs, and the gas
/// refund counter. Lives outside [`CallFrame`] so that incorporating a
/// child frame's effects into its parent never requires copying a frame's
/// bulkier fields (spec §4.5 child-frame incorporation).
#[derive(Debug, Default)]
pub struct Substate {
    accessed_addresses: FxHashSet<Address>,
    accessed_storage_keys: FxHashSet<(Address, H256)>,
    selfdestruct_set: FxHashSet<Address>,
    touched_accounts: FxHashSet<Address>,
    logs: Vec<Log>,
    refunded_gas: i64,
    backups: Vec<SubstateBackup>,
}

impl Substate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-warm the sets per EIP-2929/EIP-3651: tx origin, `to`, coinbase
    /// (post-Shanghai), and every access-list entry (spec §4.7).
    pub fn prewarm(
        &mut self,
        origin: Address,
        to: Option<Address>,
        coinbase: Option<Address>,
        access_list: &[(Address, Vec<H256>)],
    ) {
        self.accessed_addresses.insert(origin);
        if let Some(to) = to {
            self.accessed_addresses.insert(to);
        }
        if let Some(coinbase) = coinbase {
            self.accessed_addresses.insert(coinbase);
        }
        for (address, keys) in access_list {
            self.accessed_addresses.insert(*address);
            for key in keys {
                self.accessed_storage_keys.insert((*address, *key));
            }
        }
    }

    /// Returns `true` if the address was already warm; marks it warm either way.
    pub fn add_accessed_address(&mut self, address: Address) -> bool {
        !self.accessed_addresses.insert(address)
    }

    pub fn is_address_accessed(&self, address: Address) -> bool {
        self.accessed_addresses.contains(&address)
    }

    pub fn add_accessed_slot(&mut self, address: Address, key: H256) -> bool {
        !self.accessed_storage_keys.insert((address, key))
    }

    pub fn is_slot_accessed(&self, address: Address, key: H256) -> bool {
        self.accessed_storage_keys.contains(&(address, key))
    }

    pub fn add_selfdestruct(&mut self, address: Address) {
        self.selfdestruct_set.insert(address);
    }

    pub fn is_selfdestruct(&self, address: Address) -> bool {
        self.selfdestruct_set.contains(&address)
    }

    pub fn selfdestruct_set(&self) -> &FxHashSet<Address> {
        &self.selfdestruct_set
    }

    pub fn touch(&mut self, address: Address) {
        self.touched_accounts.insert(address);
    }

    pub fn touched_accounts(&self) -> &FxHashSet<Address> {
        &self.touched_accounts
    }

    pub fn add_log(&mut self, log: Log) {
        self.logs.push(log);
    }

    pub fn extract_logs(&mut self) -> Vec<Log> {
        std::mem::take(&mut self.logs)
    }

    pub fn add_refund(&mut self, delta: i64) {
        self.refunded_gas = self.refunded_gas.saturating_add(delta);
    }

    pub fn refunded_gas(&self) -> i64 {
        self.refunded_gas
    }

    /// EIP-150/spec §4.7: refund is capped at `gas_used / refund_divisor`,
    /// applied once at the top level, never per-frame.
    pub fn capped_refund(&self, gas_used: u64, divisor: u64) -> u64 {
        let cap = gas_used / divisor.max(1);
        let refund = u64::try_from(self.refunded_gas.max(0)).unwrap_or(u64::MAX);
        refund.min(cap)
    }

    /// Snapshot revertible state before entering a child call (spec §4.5).
    pub fn push_backup(&mut self) {
        self.backups.push(SubstateBackup {
            selfdestruct_set: self.selfdestruct_set.clone(),
            touched_accounts: self.touched_accounts.clone(),
            log_count: self.logs.len(),
            refunded_gas: self.refunded_gas,
        });
    }

    /// The child succeeded: discard the backup, keeping all its effects.
    pub fn commit_backup(&mut self) -> Result<(), VMError> {
        self.backups
            .pop()
            .ok_or(InternalError::SnapshotUnderflow)?;
        Ok(())
    }

    /// The child reverted or halted: restore selfdestructs/touches/refund
    /// and truncate logs back to the pre-call count.
    pub fn revert_backup(&mut self) -> Result<(), VMError> {
        let backup = self
            .backups
            .pop()
            .ok_or(InternalError::SnapshotUnderflow)?;
        self.selfdestruct_set = backup.selfdestruct_set;
        self.touched_accounts = backup.touched_accounts;
        self.logs.truncate(backup.log_count);
        self.refunded_gas = backup.refunded_gas;
        Ok(())
    }

    /// `eth_createAccessList` support (SPEC_FULL.md §4): every address and
    /// storage key this execution actually touched.
    pub fn make_access_list(&self) -> Vec<(Address, Vec<H256>)> {
        let mut grouped: FxHashMap<Address, Vec<H256>> = FxHashMap::default();
        for address in &self.accessed_addresses {
            grouped.entry(*address).or_default();
        }
        for (address, key) in &self.accessed_storage_keys {
            grouped.entry(*address).or_default().push(*key);
        }
        let mut list: Vec<_> = grouped.into_iter().collect();
        list.sort_by_key(|(address, _)| *address);
        for (_, keys) in &mut list {
            keys.sort();
        }
        list
    }
}

/// Outcome of running one call/create frame to completion, used to
/// incorporate its effects into the parent (spec §4.5).
#[derive(Debug, Clone)]
pub struct FrameOutcome {
    pub success: bool,
    pub gas_used: u64,
    pub gas_refunded_delta: i64,
    pub output: Bytes,
}

/// The interpreter: a flat call-frame stack, the journaled database, the
/// cross-frame substate, and the active execution environment. One `VM` is
/// built per transaction (spec §4.7's `process_transaction` owns it).
pub struct VM<'a> {
    pub env: Environment,
    pub db: &'a mut GeneralizedDatabase,
    pub substate: Substate,
    pub call_frames: Vec<CallFrame>,
    /// Storage values as of the start of the transaction, for SSTORE's
    /// "original value" gas accounting (spec §4.2, §4.5) — snapshotted once,
    /// not re-read per opcode.
    pub storage_original_values: FxHashMap<(Address, H256), U256>,
    pub hooks: Vec<std::rc::Rc<std::cell::RefCell<dyn Hook>>>,
    pub tracer: Option<Box<dyn crate::trace::VMTracer>>,
    /// Injection point for the `POINT_EVALUATION` precompile's pairing check
    /// (spec §6's narrow-interface principle keeps the KZG math itself out
    /// of this crate). Defaults to a verifier that rejects every proof.
    pub kzg_verifier: Box<dyn crate::precompiles::KzgVerifier>,
    steps: u64,
}

impl<'a> VM<'a> {
    pub fn new(
        env: Environment,
        db: &'a mut GeneralizedDatabase,
        hooks: Vec<std::rc::Rc<std::cell::RefCell<dyn Hook>>>,
    ) -> Self {
        Self {
            env,
            db,
            substate: Substate::new(),
            call_frames: Vec::new(),
            storage_original_values: FxHashMap::default(),
            hooks,
            tracer: None,
            kzg_verifier: Box::new(crate::precompiles::UnconfiguredVerifier),
            steps: 0,
        }
    }

    pub fn current_call_frame(&self) -> Result<&CallFrame, VMError> {
        self.call_frames
            .last()
            .ok_or_else(|| InternalError::NoActiveCallFrame.into())
    }

    pub fn current_call_frame_mut(&mut self) -> Result<&mut CallFrame, VMError> {
        self.call_frames
            .last_mut()
            .ok_or_else(|| InternalError::NoActiveCallFrame.into())
    }

    pub fn depth(&self) -> usize {
        self.call_frames.len()
    }

    /// Run the whole transaction: pushes the outermost frame, drives it to
    /// completion, and returns the aggregate outcome after applying (or
    /// discarding) the root checkpoint. Intrinsic-gas debiting and
    /// nonce/balance bookkeeping are the caller's job (`transaction::process`).
    pub fn execute(
        &mut self,
        caller: Address,
        to: Option<Address>,
        code: Bytes,
        code_address: Address,
        calldata: Bytes,
        value: U256,
        gas_limit: u64,
        is_create: bool,
    ) -> Result<FrameOutcome, VMError> {
        self.db.begin_transaction();
        self.substate.touch(caller);
        if let Some(to) = to {
            self.substate.touch(to);
        }

        let root = CallFrame::new(
            caller,
            to.unwrap_or(code_address),
            code_address,
            code,
            value,
            calldata,
            false,
            gas_limit,
            0,
            true,
            is_create,
        );
        self.call_frames.push(root);

        let outcome = self.run_current_frame();
        match &outcome {
            Ok(result) if result.success => self.db.commit_transaction()?,
            _ => self.db.rollback_transaction()?,
        }
        outcome
    }

    /// Drive the frame at the top of `call_frames` to completion, handling
    /// `REVERT`/halt/`STOP`/`RETURN` uniformly (spec §4.5). Opcode handlers
    /// that perform a nested call/create push a child frame and call this
    /// recursively to run it to completion before incorporating its
    /// [`FrameOutcome`] into the parent (spec §4.5's child-frame
    /// incorporation rule) and returning `OpcodeResult::Continue`.
    pub(crate) fn run_current_frame(&mut self) -> Result<FrameOutcome, VMError> {
        let fork = self.env.config.fork;
        let table = opcodes::build_opcode_table(fork);

        loop {
            self.steps = self.steps.saturating_add(1);
            if self.steps % YIELD_EVERY_N_STEPS == 0 {
                // Cooperative-yield point (spec §4.5, §5): nothing to await
                // in a synchronous interpreter, kept as a named hook so an
                // embedder running many VMs on one thread has somewhere to
                // plug in a cancellation check.
            }

            let opcode = match self.current_call_frame()?.current_opcode() {
                Some(op) => op,
                None => return self.finish_frame(true, Bytes::new()),
            };

            if self.depth() == 0 {
                return Err(InternalError::NoActiveCallFrame.into());
            }

            let handler = table[usize::from(opcode)];
            let before_pc = self.current_call_frame()?.pc;
            let before_ctx = self.tracer.is_some().then(|| self.op_context(opcode, before_pc));

            let step = handler(self);

            if let Some(ctx) = before_ctx {
                self.trace_step(&ctx, &step);
            }

            match step {
                Ok(OpcodeResult::Continue) => {
                    let frame = self.current_call_frame_mut()?;
                    if frame.pc == before_pc {
                        frame.pc = frame.pc.saturating_add(1);
                    }
                }
                Ok(OpcodeResult::Return(data)) => {
                    return self.finish_frame(true, data);
                }
                Ok(OpcodeResult::Revert(data)) => {
                    return self.finish_frame(false, data);
                }
                Err(VMError::ExceptionalHalt(halt)) => {
                    return self.finish_frame_halted(halt);
                }
                Err(other) => return Err(other),
            }
        }
    }

    /// Snapshot the active frame just before `opcode` runs (spec §6). Only
    /// built when a tracer is attached — `before_ctx` above skips this
    /// entirely for the untraced hot path.
    fn op_context(&self, opcode: u8, pc: usize) -> crate::trace::OpContext {
        let frame = self.call_frames.last();
        crate::trace::OpContext {
            pc,
            op: opcode,
            op_name: opcodes::codes::opcode_name(opcode),
            gas: frame.map(|f| f.gas_remaining).unwrap_or_default(),
            depth: self.depth(),
            stack: frame.map(|f| f.stack.values().to_vec()).unwrap_or_default(),
            memory_size: frame.map(|f| f.memory.len()).unwrap_or_default(),
        }
    }

    /// Emit `op_end`/`op_exception` for one instruction, extracting the
    /// tracer out of `self` first so the event handler can freely read
    /// `self.call_frames` without a double-borrow.
    fn trace_step(&mut self, ctx: &crate::trace::OpContext, step: &Result<OpcodeResult, VMError>) {
        let Some(mut tracer) = self.tracer.take() else {
            return;
        };
        let gas_after = self.call_frames.last().map(|f| f.gas_remaining).unwrap_or(0);
        let gas_cost = ctx.gas.saturating_sub(gas_after);
        match step {
            Ok(_) => tracer.op_end(ctx, gas_cost, self.substate.refunded_gas()),
            Err(VMError::ExceptionalHalt(halt)) => tracer.op_exception(ctx, &halt.to_string()),
            Err(other) => tracer.op_exception(ctx, &other.to_string()),
        }
        self.tracer = Some(tracer);
    }

    fn finish_frame(&mut self, success: bool, output: Bytes) -> Result<FrameOutcome, VMError> {
        let frame = self
            .call_frames
            .pop()
            .ok_or(InternalError::NoActiveCallFrame)?;
        Ok(FrameOutcome {
            success,
            gas_used: frame.gas_limit.saturating_sub(frame.gas_remaining),
            gas_refunded_delta: 0,
            output,
        })
    }

    fn finish_frame_halted(&mut self, _halt: ExceptionalHalt) -> Result<FrameOutcome, VMError> {
        let frame = self
            .call_frames
            .pop()
            .ok_or(InternalError::NoActiveCallFrame)?;
        Ok(FrameOutcome {
            success: false,
            gas_used: frame.gas_limit,
            gas_refunded_delta: 0,
            output: Bytes::new(),
        })
    }

    /// Depth-limit check shared by `*CALL*` and `CREATE*` (spec §3, §4.5).
    pub fn check_call_depth(&self) -> Result<(), ExceptionalHalt> {
        if self.depth() >= STACK_DEPTH_LIMIT {
            Err(ExceptionalHalt::StackDepthLimit)
        } else {
            Ok(())
        }
    }

    /// EIP-3541: deployed code may not start with `0xEF`. EIP-170: deployed
    /// code may not exceed `MAX_CODE_SIZE`.
    pub fn validate_deployed_code(&self, code: &[u8]) -> Result<(), ExceptionalHalt> {
        if self.env.config.fork.eip(eips::EIP_3541)
            && code.first() == Some(&INVALID_CONTRACT_PREFIX)
        {
            return Err(ExceptionalHalt::InvalidContractPrefix);
        }
        if self.env.config.fork.eip(crate::fork::eips::EIP_170) && code.len() > MAX_CODE_SIZE {
            return Err(ExceptionalHalt::AddressCollision);
        }
        Ok(())
    }

    /// Warm an address, returning its prior warmth and charging the caller
    /// nothing — callers combine this with `gas_cost::account_access_cost`.
    pub fn access_address(&mut self, address: Address) -> bool {
        self.substate.add_accessed_address(address)
    }

    pub fn access_storage_slot(&mut self, address: Address, key: H256) -> bool {
        self.substate.add_accessed_slot(address, key)
    }

    /// Record (once per transaction) the pre-transaction value of a slot,
    /// used by SSTORE gas accounting (spec §4.2).
    pub fn original_storage_value(&mut self, address: Address, key: H256) -> Result<U256, VMError> {
        if let Some(value) = self.storage_original_values.get(&(address, key)) {
            return Ok(*value);
        }
        let value = if self.db.was_created_this_transaction(address) {
            U256::zero()
        } else {
            self.db.get_storage(address, key)?
        };
        self.storage_original_values.insert((address, key), value);
        Ok(value)
    }

    /// Build a fresh `AccountInfo` for a newly created contract address,
    /// marking it created-this-transaction (spec §4.5 `CREATE`/`CREATE2`).
    pub fn initialize_created_account(&mut self, address: Address) -> Result<(), VMError> {
        self.db.mark_account_created(address);
        self.db.set_account(address, AccountInfo { nonce: 1, ..Default::default() })?;
        self.substate.touch(address);
        Ok(())
    }

    pub fn ctx(&self) -> Result<&FrameContext, VMError> {
        Ok(&self.current_call_frame()?.ctx)
    }

    // -- small conveniences shared by every opcode handler ------------------

    pub fn pop(&mut self) -> Result<U256, VMError> {
        Ok(self.current_call_frame_mut()?.stack.pop()?)
    }

    pub fn push(&mut self, value: U256) -> Result<(), VMError> {
        Ok(self.current_call_frame_mut()?.stack.push(value)?)
    }

    pub fn charge(&mut self, amount: u64) -> Result<(), VMError> {
        Ok(self.current_call_frame_mut()?.charge_gas(amount)?)
    }

    pub fn gas_remaining(&self) -> Result<u64, VMError> {
        Ok(self.current_call_frame()?.gas_remaining)
    }

    /// Charge memory-expansion gas for the given byte ranges and grow the
    /// current frame's memory to cover the largest one (spec §4.3).
    pub fn expand_memory(&mut self, ranges: &[(usize, usize)]) -> Result<(), VMError> {
        let current_len = self.current_call_frame()?.memory.len();
        let (cost, new_len) = gas_cost::memory_expansion_cost(current_len, ranges)?;
        self.charge(cost)?;
        self.current_call_frame_mut()?.memory.resize(new_len);
        Ok(())
    }

    /// EIP-2929 cold/warm surcharge for touching an external account,
    /// warming it as a side effect.
    pub fn charge_account_access(&mut self, address: Address) -> Result<(), VMError> {
        let fork = self.env.config.fork;
        let warm = self.access_address(address);
        self.charge(gas_cost::account_access_cost(fork, warm))
    }
}
