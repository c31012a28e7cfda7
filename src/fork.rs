//! Fork registry: maps a named hard fork to its active EIP set.
//!
//! The opcode and precompile *tables* built from a `Fork` live in
//! `opcodes::build_opcode_table` and `precompiles::build_precompile_table` —
//! keeping the fork/EIP bookkeeping here and the dispatch tables there
//! mirrors how the teacher splits `ethrex_levm::EVMConfig` (fork selection)
//! from `vm::VM::build_opcode_table` (table construction).

use std::collections::BTreeSet;

/// A named Ethereum hard fork, ordered chronologically. `Ord`/`PartialOrd`
/// let call sites write `fork >= Fork::London` the way the teacher does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display)]
pub enum Fork {
    Frontier,
    Homestead,
    Dao,
    Tangerine,
    SpuriousDragon,
    Byzantium,
    Constantinople,
    Petersburg,
    Istanbul,
    MuirGlacier,
    Berlin,
    London,
    ArrowGlacier,
    GrayGlacier,
    Paris,
    Shanghai,
    Cancun,
    Prague,
    /// Provisional: EIP set not finalized upstream (spec.md §9 Open Questions).
    Osaka,
}

impl Default for Fork {
    fn default() -> Self {
        Fork::Prague
    }
}

/// EIP numbers referenced by conditional logic throughout the crate. Using a
/// real `u16` rather than named booleans keeps `eip(n)`/`eip_select` generic,
/// matching spec.md §4.4.
pub mod eips {
    pub const EIP_7: u16 = 7; // DELEGATECALL
    pub const EIP_140: u16 = 140; // REVERT
    pub const EIP_150: u16 = 150;
    pub const EIP_152: u16 = 152; // BLAKE2F precompile
    pub const EIP_196: u16 = 196; // BN254 ADD/MUL precompiles
    pub const EIP_197: u16 = 197; // BN254 PAIRING precompile
    pub const EIP_198: u16 = 198; // MODEXP precompile
    pub const EIP_155: u16 = 155;
    pub const EIP_161: u16 = 161;
    pub const EIP_170: u16 = 170;
    pub const EIP_145: u16 = 145; // SHL/SHR/SAR
    pub const EIP_211: u16 = 211; // RETURNDATASIZE/RETURNDATACOPY
    pub const EIP_214: u16 = 214; // STATICCALL
    pub const EIP_1014: u16 = 1014; // CREATE2
    pub const EIP_1052: u16 = 1052; // EXTCODEHASH
    pub const EIP_1108: u16 = 1108;
    pub const EIP_1344: u16 = 1344; // CHAINID
    pub const EIP_1884: u16 = 1884; // SELFBALANCE
    pub const EIP_1153: u16 = 1153;
    pub const EIP_1559: u16 = 1559;
    pub const EIP_2200: u16 = 2200;
    pub const EIP_2565: u16 = 2565;
    pub const EIP_2718: u16 = 2718;
    pub const EIP_2929: u16 = 2929;
    pub const EIP_2930: u16 = 2930;
    pub const EIP_2935: u16 = 2935;
    pub const EIP_3198: u16 = 3198; // BASEFEE opcode
    pub const EIP_3529: u16 = 3529;
    pub const EIP_3541: u16 = 3541;
    pub const EIP_3607: u16 = 3607;
    pub const EIP_3651: u16 = 3651;
    pub const EIP_3855: u16 = 3855; // PUSH0
    pub const EIP_3860: u16 = 3860;
    pub const EIP_4399: u16 = 4399; // PREVRANDAO
    pub const EIP_4788: u16 = 4788;
    pub const EIP_4844: u16 = 4844;
    pub const EIP_4895: u16 = 4895; // withdrawals
    pub const EIP_5656: u16 = 5656; // MCOPY
    pub const EIP_6110: u16 = 6110;
    pub const EIP_6780: u16 = 6780;
    pub const EIP_7002: u16 = 7002;
    pub const EIP_7251: u16 = 7251;
    pub const EIP_7516: u16 = 7516; // BLOBBASEFEE
    pub const EIP_7623: u16 = 7623;
    pub const EIP_7685: u16 = 7685;
    pub const EIP_7702: u16 = 7702;
    pub const EIP_7825: u16 = 7825;
    pub const EIP_7883: u16 = 7883; // MODEXP repricing (Osaka)
    pub const EIP_7907: u16 = 7907; // larger contract code (Osaka, provisional)
}

impl Fork {
    /// The EIPs active as of this fork. Each fork extends its predecessor's
    /// set (spec.md §8's monotonicity invariant), built by folding forward
    /// rather than listing cumulative sets by hand.
    pub fn active_eips(self) -> BTreeSet<u16> {
        use eips::*;

        let mut set = BTreeSet::new();
        let mut add = |eips: &[u16], set: &mut BTreeSet<u16>| {
            set.extend(eips.iter().copied());
        };

        add(&[], &mut set); // Frontier: nothing yet
        if self >= Fork::Homestead {
            add(&[EIP_7], &mut set); // DELEGATECALL
        }
        if self >= Fork::Tangerine {
            add(&[EIP_150], &mut set);
        }
        if self >= Fork::SpuriousDragon {
            add(&[EIP_155, EIP_161, EIP_170], &mut set);
        }
        if self >= Fork::Byzantium {
            add(&[EIP_140, EIP_196, EIP_197, EIP_198, EIP_211, EIP_214], &mut set);
        }
        if self >= Fork::Constantinople {
            add(&[EIP_145, EIP_1014, EIP_1052], &mut set);
        }
        if self >= Fork::Istanbul {
            add(&[EIP_152, EIP_1344, EIP_1884], &mut set);
            // SSTORE net-gas metering v1 predates EIP-2200 naming; modeled
            // as part of Berlin's EIP-2200 activation below for simplicity,
            // matching the teacher's gas_cost fork_select ladder.
        }
        if self >= Fork::Berlin {
            add(&[EIP_2200, EIP_2718, EIP_2929, EIP_2930], &mut set);
        }
        if self >= Fork::London {
            add(&[EIP_1559, EIP_3198, EIP_3529, EIP_3541], &mut set);
        }
        if self >= Fork::Paris {
            add(&[EIP_4399], &mut set);
        }
        if self >= Fork::Shanghai {
            add(&[EIP_3651, EIP_3855, EIP_3860, EIP_4895], &mut set);
        }
        if self >= Fork::Cancun {
            add(
                &[EIP_1153, EIP_4788, EIP_4844, EIP_5656, EIP_6780, EIP_7516],
                &mut set,
            );
        }
        if self >= Fork::Prague {
            add(
                &[
                    EIP_2565, EIP_2935, EIP_3607, EIP_6110, EIP_7002, EIP_7251, EIP_7623,
                    EIP_7685, EIP_7702, EIP_7825,
                ],
                &mut set,
            );
        }
        if self >= Fork::Osaka {
            add(&[EIP_7883], &mut set);
        }
        // EIP_1108 (BN254 repricing) actually landed at Byzantium+Istanbul
        // boundary; tracked independently of the ladder above.
        if self >= Fork::Istanbul {
            set.insert(EIP_1108);
        }

        set
    }

    /// O(1)-ish membership check (the set is small; a `BTreeSet` lookup is
    /// effectively constant for our EIP counts). Central entry point used at
    /// dozens of call sites instead of ad hoc `fork >= Fork::X` comparisons
    /// when the condition is "is this EIP active", per spec.md §4.4.
    pub fn eip(self, number: u16) -> bool {
        self.active_eips().contains(&number)
    }

    /// Ternary switch picking the fork-correct constant/behaviour: `left`
    /// when the EIP is active, `right` otherwise.
    pub fn eip_select<T>(self, number: u16, left: T, right: T) -> T {
        if self.eip(number) { left } else { right }
    }

    /// Every fork from `Frontier` to `Osaka`, in order — used by property
    /// tests asserting the monotonicity invariant (spec.md §8).
    pub fn all() -> &'static [Fork] {
        &[
            Fork::Frontier,
            Fork::Homestead,
            Fork::Dao,
            Fork::Tangerine,
            Fork::SpuriousDragon,
            Fork::Byzantium,
            Fork::Constantinople,
            Fork::Petersburg,
            Fork::Istanbul,
            Fork::MuirGlacier,
            Fork::Berlin,
            Fork::London,
            Fork::ArrowGlacier,
            Fork::GrayGlacier,
            Fork::Paris,
            Fork::Shanghai,
            Fork::Cancun,
            Fork::Prague,
            Fork::Osaka,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eip_sets_are_monotonic_across_successive_forks() {
        let forks = Fork::all();
        for pair in forks.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            assert!(
                a.active_eips().is_subset(&b.active_eips()),
                "{a} active EIPs must be a subset of {b}'s"
            );
        }
    }

    #[test]
    fn eip_select_picks_the_active_branch() {
        assert_eq!(Fork::Shanghai.eip_select(eips::EIP_3855, 1, 2), 1);
        assert_eq!(Fork::Homestead.eip_select(eips::EIP_3855, 1, 2), 2);
    }
}
