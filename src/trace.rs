//! Tracer hook interface (spec §6). The interpreter emits these events at
//! well-defined points, each carrying a cheap snapshot of the frame the host
//! may inspect. [`VMTracer`]'s default (empty) method bodies mean attaching
//! no tracer costs nothing beyond the `Option::is_none()` check at each call
//! site (`vm.rs`'s `run_current_frame`). [`Eip3155Tracer`] is the one
//! reference consumer named by spec §6 — a JSON-lines structured-trace
//! producer, matching `ethrex_levm`'s own EIP-3155 tracer.

use crate::primitives::{Address, U256};
use serde::Serialize;

/// Frame snapshot passed to the per-opcode events.
#[derive(Debug, Clone)]
pub struct OpContext {
    pub pc: usize,
    pub op: u8,
    pub op_name: &'static str,
    pub gas: u64,
    pub depth: usize,
    pub stack: Vec<U256>,
    pub memory_size: usize,
}

/// Event sink the interpreter drives (spec §6). Every method has a no-op
/// default so a tracer only needs to override what it cares about.
#[allow(unused_variables)]
pub trait VMTracer {
    fn transaction_start(&mut self, gas_limit: u64) {}
    fn transaction_end(&mut self, gas_used: u64, output: &[u8], error: Option<&str>) {}
    fn op_start(&mut self, ctx: &OpContext) {}
    fn op_end(&mut self, ctx: &OpContext, gas_cost: u64, refund: i64) {}
    fn op_exception(&mut self, ctx: &OpContext, error: &str) {}
    fn evm_stop(&mut self, op: u8) {}
    fn precompile_start(&mut self, address: Address) {}
    fn precompile_end(&mut self, gas_used: u64, output: &[u8]) {}
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct Eip3155Line {
    pc: usize,
    op: u8,
    gas: String,
    gas_cost: u64,
    mem_size: usize,
    stack: Vec<String>,
    depth: usize,
    refund: i64,
    op_name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Accumulates one JSON line per instruction (spec §6's EIP-3155 shape).
/// Kept entirely in memory — handing the lines to a writer/socket is the
/// embedder's job, out of scope here same as every other I/O boundary.
#[derive(Debug, Default)]
pub struct Eip3155Tracer {
    lines: Vec<String>,
}

impl Eip3155Tracer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl VMTracer for Eip3155Tracer {
    fn op_end(&mut self, ctx: &OpContext, gas_cost: u64, refund: i64) {
        let line = Eip3155Line {
            pc: ctx.pc,
            op: ctx.op,
            gas: format!("0x{:x}", ctx.gas),
            gas_cost,
            mem_size: ctx.memory_size,
            stack: ctx.stack.iter().map(|v| format!("0x{v:x}")).collect(),
            depth: ctx.depth,
            refund,
            op_name: ctx.op_name,
            error: None,
        };
        self.lines.push(serde_json::to_string(&line).unwrap_or_default());
    }

    fn op_exception(&mut self, ctx: &OpContext, error: &str) {
        let line = Eip3155Line {
            pc: ctx.pc,
            op: ctx.op,
            gas: format!("0x{:x}", ctx.gas),
            gas_cost: 0,
            mem_size: ctx.memory_size,
            stack: ctx.stack.iter().map(|v| format!("0x{v:x}")).collect(),
            depth: ctx.depth,
            refund: 0,
            op_name: ctx.op_name,
            error: Some(error.to_string()),
        };
        self.lines.push(serde_json::to_string(&line).unwrap_or_default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn op_end_produces_one_line_per_call() {
        let mut tracer = Eip3155Tracer::new();
        let ctx = OpContext {
            pc: 0,
            op: 0x00,
            op_name: "STOP",
            gas: 21000,
            depth: 0,
            stack: vec![],
            memory_size: 0,
        };
        tracer.op_end(&ctx, 0, 0);
        assert_eq!(tracer.lines().len(), 1);
        assert!(tracer.lines()[0].contains("\"opName\":\"STOP\""));
    }
}
