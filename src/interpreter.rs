//! Script evaluation and the verification protocol.

use core::{
    cmp::{max, min},
    slice::Iter,
};

use ripemd::Ripemd160;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use tracing::{debug, trace};

#[cfg(feature = "signature-validation")]
use crate::external::pubkey::PubKey;
use crate::{
    extension::{Extension, Flow},
    num::ScriptNum,
    opcode::{push_value::SmallValue, Control, Opcode, Operation::*, PushValue},
    script::{self, Program, MAX_SCRIPT_ELEMENT_SIZE, MAX_SCRIPT_SIZE},
    script_error::{Error, ScriptError},
    signature,
};

/// Threshold for lock_time: below this value it is interpreted as block number, otherwise as UNIX
/// timestamp.
pub const LOCKTIME_THRESHOLD: i64 = 500_000_000; // Tue Nov  5 00:53:20 1985 UTC

/// Maximum number of non-push operations per script
pub const MAX_OP_COUNT: usize = 201;

/// Maximum number of public keys per multisig
pub const MAX_PUBKEY_COUNT: u8 = 20;

/// Maximum combined size of the stack and altstack
pub const MAX_STACK_DEPTH: usize = 1000;

bitflags::bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    /// Script verification flags
    pub struct Flags: u32 {
        /// Evaluate P2SH subscripts (softfork safe,
        /// [BIP16](https://github.com/bitcoin/bips/blob/master/bip-0016.mediawiki).
        const P2SH = 1 << 0;

        /// Passing a non-strict-DER signature or one with undefined hashtype to a checksig operation causes script failure.
        /// Evaluating a pubkey that is not (0x04 + 64 bytes) or (0x02 or 0x03 + 32 bytes) by checksig causes script failure.
        /// (softfork safe, but not used or intended as a consensus rule).
        const StrictEnc = 1 << 1;

        /// Passing a non-strict-DER signature to a checksig operation causes script failure
        /// (softfork safe, [BIP66](https://github.com/bitcoin/bips/blob/master/bip-0066.mediawiki)).
        const DerSig = 1 << 2;

        /// Passing a non-strict-DER signature or one with S > order/2 to a checksig operation causes script failure
        /// (softfork safe, [BIP62](https://github.com/bitcoin/bips/blob/master/bip-0062.mediawiki) rule 5).
        const LowS = 1 << 3;

        /// verify dummy stack item consumed by CHECKMULTISIG is of zero-length (softfork safe, [BIP62](https://github.com/bitcoin/bips/blob/master/bip-0062.mediawiki) rule 7).
        const NullDummy = 1 << 4;

        /// Using a non-push operator in the scriptSig causes script failure (softfork safe, [BIP62](https://github.com/bitcoin/bips/blob/master/bip-0062.mediawiki) rule 2).
        const SigPushOnly = 1 << 5;

        /// Require minimal encodings for all push operations (OP_0... OP_16, OP_1NEGATE where possible, direct
        /// pushes up to 75 bytes, OP_PUSHDATA up to 255 bytes, OP_PUSHDATA2 for anything larger). Evaluating
        /// any other push causes the script to fail ([BIP62](https://github.com/bitcoin/bips/blob/master/bip-0062.mediawiki) rule 3).
        /// In addition, whenever a stack element is interpreted as a number, it must be of minimal length ([BIP62](https://github.com/bitcoin/bips/blob/master/bip-0062.mediawiki) rule 4).
        /// (softfork safe)
        const MinimalData = 1 << 6;

        /// Discourage use of NOPs reserved for upgrades (NOP1-10)
        ///
        /// Provided so that nodes can avoid accepting or mining transactions
        /// containing executed NOP's whose meaning may change after a soft-fork,
        /// thus rendering the script invalid; with this flag set executing
        /// discouraged NOPs fails the script. This verification flag will never be
        /// a mandatory flag applied to scripts in a block. NOPs that are not
        /// executed, e.g.  within an unexecuted IF ENDIF block, are *not* rejected.
        const DiscourageUpgradableNOPs = 1 << 7;

        /// Require that only a single stack element remains after evaluation. This changes the success criterion from
        /// "At least one stack element must remain, and when interpreted as a boolean, it must be true" to
        /// "Exactly one stack element must remain, and when interpreted as a boolean, it must be true".
        /// (softfork safe, [BIP62](https://github.com/bitcoin/bips/blob/master/bip-0062.mediawiki) rule 6)
        /// Note: CLEANSTACK should never be used without P2SH.
        const CleanStack = 1 << 8;

        /// Verify CHECKLOCKTIMEVERIFY
        ///
        /// See [BIP65](https://github.com/bitcoin/bips/blob/master/bip-0065.mediawiki) for details.
        const CHECKLOCKTIMEVERIFY = 1 << 9;
    }
}

/// The resource limits enforced during evaluation. The defaults are Bitcoin’s consensus values.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Limits {
    pub max_push_size: usize,
    pub max_op_count: usize,
    pub max_stack_size: usize,
    pub max_script_size: usize,
    /// The operand size for numeric opcodes. `OP_CHECKLOCKTIMEVERIFY` always accepts 5 bytes.
    pub max_num_size: usize,
    pub max_pubkey_count: u8,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_push_size: MAX_SCRIPT_ELEMENT_SIZE,
            max_op_count: MAX_OP_COUNT,
            max_stack_size: MAX_STACK_DEPTH,
            max_script_size: MAX_SCRIPT_SIZE,
            max_num_size: crate::num::DEFAULT_MAX_SIZE,
            max_pubkey_count: MAX_PUBKEY_COUNT,
        }
    }
}

impl Limits {
    pub fn with_max_push_size(self, max_push_size: usize) -> Self {
        Limits {
            max_push_size,
            ..self
        }
    }

    pub fn with_max_op_count(self, max_op_count: usize) -> Self {
        Limits {
            max_op_count,
            ..self
        }
    }

    pub fn with_max_stack_size(self, max_stack_size: usize) -> Self {
        Limits {
            max_stack_size,
            ..self
        }
    }

    pub fn with_max_script_size(self, max_script_size: usize) -> Self {
        Limits {
            max_script_size,
            ..self
        }
    }

    pub fn with_max_num_size(self, max_num_size: usize) -> Self {
        Limits {
            max_num_size,
            ..self
        }
    }

    pub fn with_max_pubkey_count(self, max_pubkey_count: u8) -> Self {
        Limits {
            max_pubkey_count,
            ..self
        }
    }
}

pub trait SignatureChecker {
    /// `sig` still carries its trailing hash type byte, and `script_code` is the subscript the
    /// signature commits to.
    fn check_sig(&self, _sig: &[u8], _pub_key: &[u8], _script_code: &script::Code) -> bool {
        false
    }

    fn check_lock_time(&self, _lock_time: i64) -> bool {
        false
    }
}

/// Rejects every signature and every lock time.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct NullSignatureChecker();

impl SignatureChecker for NullSignatureChecker {}

/// All signature hashes are 32 bytes, since they are SHA-256d outputs.
pub const SIGHASH_SIZE: usize = 32;

/// A function which is called to obtain the sighash.
///    - script_code: the subscript being validated. Note that this not always matches the
///      output script, i.e. for P2SH or after an `OP_CODESEPARATOR`.
///    - hash_type: the raw hash type byte from the end of the signature.
///
/// Returning `None` indicates _some_ failure to produce the desired hash.
pub type SighashCalculator<'a> = &'a dyn Fn(&script::Code, u8) -> Option<[u8; SIGHASH_SIZE]>;

#[cfg(feature = "signature-validation")]
#[derive(Copy, Clone)]
pub struct CallbackSignatureChecker<'a> {
    pub sighash: SighashCalculator<'a>,
    /// This is stored as an `i64` instead of the `u32` used by transactions to avoid partial
    /// conversions when reading from the stack.
    pub lock_time: i64,
    pub is_final: bool,
}

#[cfg(feature = "signature-validation")]
impl SignatureChecker for CallbackSignatureChecker<'_> {
    fn check_sig(&self, vch_sig: &[u8], vch_pub_key: &[u8], script_code: &script::Code) -> bool {
        let pubkey = PubKey(vch_pub_key);
        if !pubkey.is_valid() {
            return false;
        };

        signature::Decoded::from_bytes(vch_sig)
            .and_then(|sig| {
                (self.sighash)(script_code, sig.sighash_type())
                    .map(|sighash| pubkey.verify(&sighash, sig.sig()))
            })
            .unwrap_or(false)
    }

    fn check_lock_time(&self, lock_time: i64) -> bool {
        // There are two kinds of nLockTime: lock-by-blockheight
        // and lock-by-blocktime, distinguished by whether
        // nLockTime < LOCKTIME_THRESHOLD.
        //
        // We want to compare apples to apples, so fail the script
        // unless the type of nLockTime being tested is the same as
        // the nLockTime in the transaction.
        if self.lock_time < LOCKTIME_THRESHOLD && lock_time >= LOCKTIME_THRESHOLD
            || self.lock_time >= LOCKTIME_THRESHOLD && lock_time < LOCKTIME_THRESHOLD
            // Now that we know we're comparing apples-to-apples, the
            // comparison is a simple numeric one.
            || lock_time > self.lock_time
        {
            false
            // Finally the nLockTime feature can be disabled and thus
            // CHECKLOCKTIMEVERIFY bypassed if every txin has been
            // finalized by setting nSequence to maxint. The
            // transaction would be allowed into the blockchain, making
            // the opcode ineffective.
            //
            // Testing if this vin is not final is sufficient to
            // prevent this condition. Alternatively we could test all
            // inputs, but testing just this input minimizes the data
            // required to prove correct CHECKLOCKTIMEVERIFY execution.
        } else {
            !self.is_final
        }
    }
}

pub fn cast_to_bool(vch: &[u8]) -> bool {
    match vch.split_last() {
        None => false,
        // Can be negative zero
        Some((last, rest)) => rest.iter().any(|b| *b != 0) || (*last != 0 && *last != 0x80),
    }
}

pub fn cast_from_bool(b: bool) -> Vec<u8> {
    if b {
        vec![1]
    } else {
        vec![]
    }
}

fn invalid_stack_operation(detail: String) -> Error {
    Error::with_detail(ScriptError::InvalidStackOperation, detail)
}

/**
 * Script is a stack machine (like Forth) that evaluates a predicate
 * returning a bool indicating valid or not.  There are no loops.
 */
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stack<T>(Vec<T>);

/// Wraps a Vec, indexing from the top of the stack the way script opcodes describe their operands.
impl<T> Stack<T> {
    pub fn new() -> Self {
        Stack(vec![])
    }

    /// Fail unless there are at least `needed` elements.
    pub fn check_len(&self, needed: usize) -> Result<(), Error> {
        let len = self.0.len();
        if needed <= len {
            Ok(())
        } else {
            Err(invalid_stack_operation(format!(
                "needed {needed} elements, but the stack has {len}"
            )))
        }
    }

    fn rindex(&self, i: usize) -> Result<usize, Error> {
        let len = self.0.len();
        len.checked_sub(i)
            .and_then(|n| n.checked_sub(1))
            .ok_or_else(|| {
                invalid_stack_operation(format!(
                    "tried to access element {i} from the top of a stack with {len} elements"
                ))
            })
    }

    /// The element `i` places below the top, so `rget(0)` is the top.
    pub fn rget(&self, i: usize) -> Result<&T, Error> {
        let idx = self.rindex(i)?;
        self.0
            .get(idx)
            .ok_or_else(|| invalid_stack_operation(format!("no element at {idx}")))
    }

    pub fn rremove(&mut self, i: usize) -> Result<T, Error> {
        self.rindex(i).map(|idx| self.0.remove(idx))
    }

    /// Insert `element` so that it ends up `i` places below the top.
    pub fn rinsert(&mut self, i: usize, element: T) -> Result<(), Error> {
        let len = self.0.len();
        let idx = len.checked_sub(i).ok_or_else(|| {
            invalid_stack_operation(format!(
                "tried to insert at {i} from the top of a stack with {len} elements"
            ))
        })?;
        self.0.insert(idx, element);
        Ok(())
    }

    pub fn swap(&mut self, a: usize, b: usize) -> Result<(), Error> {
        let au = self.rindex(a)?;
        let bu = self.rindex(b)?;
        self.0.swap(au, bu);
        Ok(())
    }

    /// Move the element `i` places below the top to the top.
    pub fn move_to_top(&mut self, i: usize) -> Result<(), Error> {
        let element = self.rremove(i)?;
        self.0.push(element);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<T, Error> {
        self.0
            .pop()
            .ok_or_else(|| invalid_stack_operation("tried to pop from an empty stack".into()))
    }

    pub fn push(&mut self, value: T) {
        self.0.push(value)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> Iter<'_, T> {
        self.0.iter()
    }

    pub fn last(&self) -> Result<&T, Error> {
        self.rget(0)
    }

    pub fn last_mut(&mut self) -> Result<&mut T, Error> {
        self.0
            .last_mut()
            .ok_or_else(|| invalid_stack_operation("the stack is empty".into()))
    }

    pub fn into_vec(self) -> Vec<T> {
        self.0
    }

    /// Apply `op` to the top element, replacing it with the result.
    pub fn unop(&mut self, op: impl FnOnce(T) -> Result<T, Error>) -> Result<(), Error> {
        let item = self.pop()?;
        op(item).map(|res| self.push(res))
    }

    /// Pop the top two elements and apply `op` to them (second-from-top first).
    pub fn binfn<R>(&mut self, op: impl FnOnce(T, T) -> Result<R, Error>) -> Result<R, Error> {
        self.check_len(2)?;
        let x2 = self.pop()?;
        let x1 = self.pop()?;
        op(x1, x2)
    }

    pub fn binop(&mut self, op: impl FnOnce(T, T) -> Result<T, Error>) -> Result<(), Error> {
        self.binfn(op).map(|res| self.push(res))
    }
}

impl<T: Clone> Stack<T> {
    /// Push a copy of the element `i` places below the top.
    pub fn repush(&mut self, i: usize) -> Result<(), Error> {
        let element = self.rget(i)?.clone();
        self.0.push(element);
        Ok(())
    }

    /// The top element, and a copy of everything under it.
    pub fn split_last(&self) -> Result<(&T, Stack<T>), Error> {
        self.0
            .split_last()
            .ok_or_else(|| invalid_stack_operation("the stack is empty".into()))
            .map(|(last, rem)| (last, Stack(rem.to_vec())))
    }
}

impl<T> From<Vec<T>> for Stack<T> {
    fn from(value: Vec<T>) -> Self {
        Stack(value)
    }
}

/// Are we in an executing branch of the script?
pub fn should_exec(vexec: &Stack<bool>) -> bool {
    vexec.iter().all(|value| *value)
}

/// The machine state while evaluating a single script.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct State {
    stack: Stack<Vec<u8>>,
    altstack: Stack<Vec<u8>>,
    // We keep track of how many operations have executed so far to prevent expensive-to-verify
    // scripts
    op_count: usize,
    // This keeps track of the conditional flags at each nesting level during execution. If we're in
    // a branch of execution where *any* of these conditionals are false, we ignore opcodes unless
    // those opcodes direct control flow (OP_IF, OP_ELSE, etc.).
    vexec: Stack<bool>,
    // Index of the first chunk after the most recent OP_CODESEPARATOR.
    begin_code: usize,
}

impl State {
    /// Creates a state with an initial stack, but other components empty.
    pub fn initial(stack: Stack<Vec<u8>>) -> Self {
        State {
            stack,
            ..State::default()
        }
    }

    pub fn stack(&self) -> &Stack<Vec<u8>> {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut Stack<Vec<u8>> {
        &mut self.stack
    }

    pub fn altstack(&self) -> &Stack<Vec<u8>> {
        &self.altstack
    }

    pub fn op_count(&self) -> usize {
        self.op_count
    }

    pub fn vexec(&self) -> &Stack<bool> {
        &self.vexec
    }

    pub fn begin_code(&self) -> usize {
        self.begin_code
    }
}

/// Implements the BIP65 checks against the top stack element, without consuming it.
pub fn check_lock_time_verify(
    stack: &Stack<Vec<u8>>,
    flags: Flags,
    checker: &dyn SignatureChecker,
) -> Result<(), Error> {
    // Note that elsewhere numeric opcodes are limited to
    // operands in the range -2**31+1 to 2**31-1, however it is
    // legal for opcodes to produce results exceeding that
    // range. This limitation is implemented by `ScriptNum`'s
    // default 4-byte limit.
    //
    // If we kept to that limit we'd have a year 2038 problem,
    // even though the `lock_time` field in transactions
    // themselves is u32 which only becomes meaningless
    // after the year 2106.
    //
    // Thus as a special case we tell `ScriptNum` to accept up
    // to 5-byte bignums, which are good until 2**39-1, well
    // beyond the 2**32-1 limit of the `lock_time` field itself.
    let lock_time = ScriptNum::decode(
        stack.last()?,
        flags.contains(Flags::MinimalData),
        Some(5),
    )?;

    // In the rare event that the argument may be < 0 due to
    // some arithmetic being done first, you can always use
    // 0 MAX CHECKLOCKTIMEVERIFY.
    if lock_time.value() < 0 {
        return Err(ScriptError::NegativeLockTime.into());
    }

    // Actually compare the specified lock time with the transaction.
    if !checker.check_lock_time(lock_time.value()) {
        return Err(ScriptError::UnsatisfiedLockTime.into());
    }
    Ok(())
}

fn check_signature_encoding(vch_sig: &[u8], flags: Flags) -> Result<(), Error> {
    signature::check_encoding(
        vch_sig,
        flags.intersects(Flags::DerSig | Flags::LowS | Flags::StrictEnc),
        flags.contains(Flags::LowS),
        flags.contains(Flags::StrictEnc),
    )
    .map_err(Error::from)
}

fn check_pub_key_encoding(vch_pub_key: &[u8], flags: Flags) -> Result<(), Error> {
    signature::check_pub_key_encoding(vch_pub_key, flags.contains(Flags::StrictEnc))
        .map_err(Error::from)
}

fn require_truthy(stack: &Stack<Vec<u8>>) -> Result<(), Error> {
    match stack.last() {
        Ok(top) if cast_to_bool(top) => Ok(()),
        _ => Err(ScriptError::EvalFalse.into()),
    }
}

fn arithmetic_overflow() -> Error {
    Error::with_detail(ScriptError::ScriptNum, "arithmetic overflow")
}

/// Evaluates scripts against a fixed set of flags, a signature checker, and any extensions. The
/// interpreter itself holds no evaluation state, so one instance can verify any number of script
/// pairs.
pub struct ScriptInterpreter<'a> {
    flags: Flags,
    checker: &'a dyn SignatureChecker,
    limits: Limits,
    extensions: Vec<Box<dyn Extension + 'a>>,
}

impl<'a> ScriptInterpreter<'a> {
    pub fn new(flags: Flags, checker: &'a dyn SignatureChecker) -> Self {
        ScriptInterpreter {
            flags,
            checker,
            limits: Limits::default(),
            extensions: vec![],
        }
    }

    pub fn with_limits(self, limits: Limits) -> Self {
        ScriptInterpreter { limits, ..self }
    }

    /// Extensions are consulted in the order they were added.
    pub fn with_extension(mut self, extension: Box<dyn Extension + 'a>) -> Self {
        self.extensions.push(extension);
        self
    }

    /// The effective flags: those provided to [`ScriptInterpreter::new`], plus any that extensions
    /// contribute.
    pub fn flags(&self) -> Flags {
        self.extensions
            .iter()
            .fold(self.flags, |flags, ext| flags | ext.extra_flags())
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn checker(&self) -> &dyn SignatureChecker {
        self.checker
    }

    /// Run a single script from an empty stack, without any of the checks that [`Self::verify`]
    /// applies to the result.
    pub fn run(&self, script: &Program) -> Result<(), Error> {
        self.eval(Stack::new(), script, self.flags()).map(|_| ())
    }

    /// Evaluate one script, starting from `stack`. The alt stack, conditions, op count, and code
    /// separator all start fresh.
    pub fn eval(
        &self,
        stack: Stack<Vec<u8>>,
        script: &Program,
        flags: Flags,
    ) -> Result<Stack<Vec<u8>>, Error> {
        // There's a limit on how large scripts can be.
        let script_size = script.byte_len();
        if script_size > self.limits.max_script_size {
            return Err(Error::with_detail(
                ScriptError::ScriptSize,
                format!("{script_size} bytes"),
            ));
        }

        trace!(chunks = script.len(), bytes = script_size, "evaluating script");

        let mut state = State::initial(stack);

        for (pc, op) in script.iter().enumerate() {
            self.eval_step(op, pc, script, flags, &mut state)?;
        }

        if !state.vexec.is_empty() {
            return Err(ScriptError::UnbalancedConditional.into());
        }

        Ok(state.stack)
    }

    /// Run a single chunk of `script`. `pc` is the chunk’s index, which `OP_CODESEPARATOR` records.
    ///
    /// This is useful for testing & debugging, as we can set up the exact state we want in order
    /// to trigger some behavior.
    pub fn eval_step(
        &self,
        op: &Opcode,
        pc: usize,
        script: &Program,
        flags: Flags,
        state: &mut State,
    ) -> Result<(), Error> {
        if let Opcode::PushValue(PushValue::LargeValue(lv)) = op {
            if !lv.is_well_formed() {
                return Err(Error::with_detail(
                    ScriptError::BadOpcode,
                    format!("a push of {} bytes doesn’t fit its encoding", lv.value().len()),
                ));
            }
        }

        if let Some(data) = op.push_data() {
            if data.len() > self.limits.max_push_size {
                return Err(Error::with_detail(
                    ScriptError::PushSize,
                    format!("{} bytes", data.len()),
                ));
            }
        }

        // Note how OP_RESERVED does not count towards the opcode limit.
        if op.leading_byte() > SmallValue::OP_16.into() {
            state.op_count += 1;
            if state.op_count > self.limits.max_op_count {
                return Err(ScriptError::OpCount.into());
            }
        }

        match op {
            Opcode::Disabled(_) => {
                return Err(Error::with_detail(ScriptError::DisabledOpcode, op.to_string()))
            }
            Opcode::Bad(bad) if bad.fails_unexecuted() => {
                return Err(Error::with_detail(ScriptError::BadOpcode, op.to_string()))
            }
            _ => (),
        }

        let exec = should_exec(&state.vexec);
        if exec {
            match self
                .extensions
                .iter()
                .find(|ext| ext.should_handle_opcode(op, flags))
            {
                Some(ext) => ext.handle_opcode(self, op, flags, state)?,
                None => self.exec_opcode(op, exec, pc, script, flags, state)?,
            }
        } else if let Opcode::Control(_) = op {
            // Branch bookkeeping happens even in inactive branches.
            self.exec_opcode(op, exec, pc, script, flags, state)?;
        }

        // Size limits
        if state.stack.len() + state.altstack.len() > self.limits.max_stack_size {
            return Err(ScriptError::StackSize.into());
        }

        Ok(())
    }

    fn exec_opcode(
        &self,
        opcode: &Opcode,
        exec: bool,
        pc: usize,
        script: &Program,
        flags: Flags,
        state: &mut State,
    ) -> Result<(), Error> {
        let stack = &mut state.stack;
        let require_minimal = flags.contains(Flags::MinimalData);
        let max_num_size = Some(self.limits.max_num_size);

        let decode = |vch: &[u8]| -> Result<ScriptNum, Error> {
            ScriptNum::decode(vch, require_minimal, max_num_size).map_err(Error::from)
        };

        let unfn_num = |stack: &mut Stack<Vec<u8>>,
                        op: &dyn Fn(ScriptNum) -> Option<Vec<u8>>|
         -> Result<(), Error> {
            stack.unop(|vch| decode(&vch).and_then(|bn| op(bn).ok_or_else(arithmetic_overflow)))
        };

        let unop_num = |stack: &mut Stack<Vec<u8>>,
                        op: &dyn Fn(ScriptNum) -> Option<ScriptNum>|
         -> Result<(), Error> { unfn_num(stack, &|bn| op(bn).map(|res| res.encode())) };

        let unrel = |stack: &mut Stack<Vec<u8>>, op: &dyn Fn(ScriptNum) -> bool| {
            unfn_num(stack, &|bn| Some(cast_from_bool(op(bn))))
        };

        let binfn_num = |stack: &mut Stack<Vec<u8>>,
                         op: &dyn Fn(ScriptNum, ScriptNum) -> Option<Vec<u8>>|
         -> Result<(), Error> {
            stack.binop(|x1, x2| {
                let bn1 = decode(&x1)?;
                let bn2 = decode(&x2)?;
                op(bn1, bn2).ok_or_else(arithmetic_overflow)
            })
        };

        let binop_num = |stack: &mut Stack<Vec<u8>>,
                         op: &dyn Fn(ScriptNum, ScriptNum) -> Option<ScriptNum>|
         -> Result<(), Error> {
            binfn_num(stack, &|bn1, bn2| op(bn1, bn2).map(|res| res.encode()))
        };

        let binrel = |stack: &mut Stack<Vec<u8>>, op: &dyn Fn(ScriptNum, ScriptNum) -> bool| {
            binfn_num(stack, &|bn1, bn2| Some(cast_from_bool(op(bn1, bn2))))
        };

        match opcode {
            //
            // Push value
            //
            Opcode::PushValue(pv) => {
                if require_minimal && !pv.is_minimal_push() {
                    return Err(Error::with_detail(ScriptError::MinimalData, pv.to_string()));
                }
                stack.push(pv.value());
            }

            //
            // Control
            //
            Opcode::Control(control) => match control {
                Control::OP_IF | Control::OP_NOTIF => {
                    // <expression> if [statements] [else [statements]] endif
                    let mut value = false;
                    if exec {
                        if stack.is_empty() {
                            return Err(ScriptError::UnbalancedConditional.into());
                        }
                        value = cast_to_bool(&stack.pop()?);
                        if *control == Control::OP_NOTIF {
                            value = !value
                        };
                    }
                    state.vexec.push(value);
                }

                Control::OP_ELSE => {
                    let last = state
                        .vexec
                        .last_mut()
                        .map_err(|_| Error::new(ScriptError::UnbalancedConditional))?;
                    *last = !*last;
                }

                Control::OP_ENDIF => {
                    state
                        .vexec
                        .pop()
                        .map_err(|_| Error::new(ScriptError::UnbalancedConditional))?;
                }
            },

            Opcode::Operation(op) => match op {
                OP_NOP => (),

                OP_CHECKLOCKTIMEVERIFY => {
                    if flags.contains(Flags::CHECKLOCKTIMEVERIFY) {
                        check_lock_time_verify(stack, flags, self.checker)?;
                    } else if flags.contains(Flags::DiscourageUpgradableNOPs) {
                        // not enabled; treat as a NOP2
                        return Err(ScriptError::DiscourageUpgradableNOPs.into());
                    }
                }

                OP_NOP1 | OP_NOP3 | OP_NOP4 | OP_NOP5 | OP_NOP6 | OP_NOP7 | OP_NOP8 | OP_NOP9
                | OP_NOP10 => {
                    // Do nothing, though if the caller wants to prevent people from using
                    // these NOPs (as part of a standard tx rule, for example) they can
                    // enable `DiscourageUpgradableNOPs` to turn these opcodes into errors.
                    if flags.contains(Flags::DiscourageUpgradableNOPs) {
                        return Err(ScriptError::DiscourageUpgradableNOPs.into());
                    }
                }

                OP_VERIFY => {
                    // (true -- ) or
                    // (false -- false) and return
                    if !cast_to_bool(stack.last()?) {
                        return Err(ScriptError::Verify.into());
                    }
                    stack.pop()?;
                }

                OP_RETURN => return Err(ScriptError::OpReturn.into()),

                //
                // Stack ops
                //
                OP_TOALTSTACK => {
                    let vch = stack.pop()?;
                    state.altstack.push(vch);
                }

                OP_FROMALTSTACK => {
                    let vch = state
                        .altstack
                        .pop()
                        .map_err(|_| Error::new(ScriptError::InvalidAltstackOperation))?;
                    stack.push(vch);
                }

                OP_2DROP => {
                    // (x1 x2 -- )
                    stack.check_len(2)?;
                    stack.pop()?;
                    stack.pop()?;
                }

                OP_2DUP => {
                    // (x1 x2 -- x1 x2 x1 x2)
                    stack.check_len(2)?;
                    stack.repush(1)?;
                    stack.repush(1)?;
                }

                OP_3DUP => {
                    // (x1 x2 x3 -- x1 x2 x3 x1 x2 x3)
                    stack.check_len(3)?;
                    stack.repush(2)?;
                    stack.repush(2)?;
                    stack.repush(2)?;
                }

                OP_2OVER => {
                    // (x1 x2 x3 x4 -- x1 x2 x3 x4 x1 x2)
                    stack.check_len(4)?;
                    stack.repush(3)?;
                    stack.repush(3)?;
                }

                OP_2ROT => {
                    // (x1 x2 x3 x4 x5 x6 -- x3 x4 x5 x6 x1 x2)
                    stack.check_len(6)?;
                    stack.move_to_top(5)?;
                    stack.move_to_top(5)?;
                }

                OP_2SWAP => {
                    // (x1 x2 x3 x4 -- x3 x4 x1 x2)
                    stack.check_len(4)?;
                    stack.move_to_top(3)?;
                    stack.move_to_top(3)?;
                }

                OP_IFDUP => {
                    // (x - 0 | x x)
                    if cast_to_bool(stack.last()?) {
                        stack.repush(0)?;
                    }
                }

                OP_DEPTH => {
                    // -- stacksize
                    let bn = i64::try_from(stack.len())
                        .map_err(|_| Error::new(ScriptError::StackSize))?;
                    stack.push(ScriptNum::from(bn).encode())
                }

                OP_DROP => {
                    // (x -- )
                    stack.pop()?;
                }

                OP_DUP => {
                    // (x -- x x)
                    stack.repush(0)?;
                }

                OP_NIP => {
                    // (x1 x2 -- x2)
                    stack.rremove(1)?;
                }

                OP_OVER => {
                    // (x1 x2 -- x1 x2 x1)
                    stack.repush(1)?;
                }

                OP_PICK | OP_ROLL => {
                    // (xn ... x2 x1 x0 n - xn ... x2 x1 x0 xn)
                    // (xn ... x2 x1 x0 n - ... x2 x1 x0 xn)
                    stack.check_len(2)?;
                    let n = decode(stack.last()?)?.value();
                    stack.pop()?;
                    let n = usize::try_from(n)
                        .ok()
                        .filter(|n| *n < stack.len())
                        .ok_or_else(|| {
                            invalid_stack_operation(format!(
                                "index {n} is out of range for a stack with {} elements",
                                stack.len()
                            ))
                        })?;
                    if *op == OP_ROLL {
                        stack.move_to_top(n)?;
                    } else {
                        stack.repush(n)?;
                    }
                }

                OP_ROT => {
                    // (x1 x2 x3 -- x2 x3 x1)
                    stack.check_len(3)?;
                    stack.move_to_top(2)?;
                }

                OP_SWAP => {
                    // (x1 x2 -- x2 x1)
                    stack.check_len(2)?;
                    stack.swap(1, 0)?;
                }

                OP_TUCK => {
                    // (x1 x2 -- x2 x1 x2)
                    stack.check_len(2)?;
                    let vch = stack.rget(0)?.clone();
                    stack.rinsert(2, vch)?;
                }

                OP_SIZE => {
                    // (in -- in size)
                    let bn = i64::try_from(stack.last()?.len())
                        .map_err(|_| Error::new(ScriptError::PushSize))?;
                    stack.push(ScriptNum::from(bn).encode())
                }

                //
                // Bitwise logic
                //
                // (x1 x2 - bool)
                OP_EQUAL => stack.binop(|x1, x2| Ok(cast_from_bool(x1 == x2)))?,
                OP_EQUALVERIFY => stack.binfn(|x1, x2| {
                    if x1 == x2 {
                        Ok(())
                    } else {
                        Err(Error::new(ScriptError::EqualVerify))
                    }
                })?,

                //
                // Numeric
                //

                // (in -- out)
                OP_1ADD => unop_num(stack, &|x| x.checked_add(ScriptNum::from(1)))?,
                OP_1SUB => unop_num(stack, &|x| x.checked_sub(ScriptNum::from(1)))?,
                OP_NEGATE => unop_num(stack, &|x| x.checked_neg())?,
                OP_ABS => unop_num(stack, &|x| x.checked_abs())?,
                OP_NOT => unrel(stack, &|x| x.is_zero())?,
                OP_0NOTEQUAL => unrel(stack, &|x| !x.is_zero())?,

                // (x1 x2 -- out)
                OP_ADD => binop_num(stack, &|x1, x2| x1.checked_add(x2))?,
                OP_SUB => binop_num(stack, &|x1, x2| x1.checked_sub(x2))?,
                OP_BOOLAND => binrel(stack, &|x1, x2| !x1.is_zero() && !x2.is_zero())?,
                OP_BOOLOR => binrel(stack, &|x1, x2| !x1.is_zero() || !x2.is_zero())?,
                OP_NUMEQUAL => binrel(stack, &|x1, x2| x1 == x2)?,
                OP_NUMEQUALVERIFY => stack.binfn(|x1, x2| {
                    if decode(&x1)? == decode(&x2)? {
                        Ok(())
                    } else {
                        Err(Error::new(ScriptError::NumEqualVerify))
                    }
                })?,
                OP_NUMNOTEQUAL => binrel(stack, &|x1, x2| x1 != x2)?,
                OP_LESSTHAN => binrel(stack, &|x1, x2| x1 < x2)?,
                OP_GREATERTHAN => binrel(stack, &|x1, x2| x1 > x2)?,
                OP_LESSTHANOREQUAL => binrel(stack, &|x1, x2| x1 <= x2)?,
                OP_GREATERTHANOREQUAL => binrel(stack, &|x1, x2| x1 >= x2)?,
                OP_MIN => binop_num(stack, &|x1, x2| Some(min(x1, x2)))?,
                OP_MAX => binop_num(stack, &|x1, x2| Some(max(x1, x2)))?,

                OP_WITHIN => {
                    // (x min max -- out)
                    stack.check_len(3)?;
                    let bn1 = decode(stack.rget(2)?)?;
                    let bn2 = decode(stack.rget(1)?)?;
                    let bn3 = decode(stack.rget(0)?)?;
                    let value = bn2 <= bn1 && bn1 < bn3;
                    stack.pop()?;
                    stack.pop()?;
                    stack.pop()?;
                    stack.push(cast_from_bool(value))
                }

                //
                // Crypto
                //
                OP_RIPEMD160 | OP_SHA1 | OP_SHA256 | OP_HASH160 | OP_HASH256 => {
                    // (in -- hash)
                    stack.unop(|vch| {
                        Ok(match op {
                            OP_RIPEMD160 => Ripemd160::digest(vch).to_vec(),
                            OP_SHA1 => Sha1::digest(vch).to_vec(),
                            OP_SHA256 => Sha256::digest(vch).to_vec(),
                            OP_HASH160 => Ripemd160::digest(Sha256::digest(vch)).to_vec(),
                            _ => Sha256::digest(Sha256::digest(vch)).to_vec(),
                        })
                    })?
                }

                OP_CODESEPARATOR => {
                    // Hash starts after the code separator
                    state.begin_code = pc + 1;
                }

                OP_CHECKSIG | OP_CHECKSIGVERIFY => {
                    // (sig pubkey -- bool)
                    stack.check_len(2)?;

                    let vch_sig = stack.rget(1)?.clone();
                    let vch_pub_key = stack.rget(0)?.clone();

                    // Subset of script starting at the most recent codeseparator, without the
                    // signature, since there's no way for a signature to sign itself.
                    let script_code =
                        script::Code::from(&script.subscript(state.begin_code).find_and_delete(&vch_sig));

                    check_signature_encoding(&vch_sig, flags)?;
                    check_pub_key_encoding(&vch_pub_key, flags)?;
                    let success = self.checker.check_sig(&vch_sig, &vch_pub_key, &script_code);

                    stack.pop()?;
                    stack.pop()?;
                    if *op == OP_CHECKSIGVERIFY {
                        if !success {
                            return Err(ScriptError::CheckSigVerify.into());
                        }
                    } else {
                        stack.push(cast_from_bool(success));
                    }
                }

                OP_CHECKMULTISIG | OP_CHECKMULTISIGVERIFY => {
                    // ([sig ...] num_of_signatures [pubkey ...] num_of_pubkeys -- bool)

                    // NB: This is guaranteed u8-safe, because we are limited to 20 keys and
                    //     20 signatures, plus a couple other fields. u8 also gives us total
                    //     conversions to the other types we deal with here (`usize` and `i64`).
                    let mut i: u8 = 1;
                    stack.check_len(i.into())?;

                    let mut keys_count = u8::try_from(decode(stack.rget(usize::from(i) - 1)?)?.value())
                        .ok()
                        .filter(|n| *n <= self.limits.max_pubkey_count)
                        .ok_or_else(|| Error::new(ScriptError::PubKeyCount))?;
                    state.op_count += usize::from(keys_count);
                    if state.op_count > self.limits.max_op_count {
                        return Err(ScriptError::OpCount.into());
                    };
                    i += 1;
                    let mut ikey = i;
                    i = i
                        .checked_add(keys_count)
                        .ok_or_else(|| Error::new(ScriptError::PubKeyCount))?;
                    stack.check_len(i.into())?;

                    let mut sigs_count = u8::try_from(decode(stack.rget(usize::from(i) - 1)?)?.value())
                        .ok()
                        .filter(|n| *n <= keys_count)
                        .ok_or_else(|| Error::new(ScriptError::SigCount))?;
                    i = i
                        .checked_add(1)
                        .ok_or_else(|| Error::new(ScriptError::PubKeyCount))?;
                    let mut isig = i;
                    i = i
                        .checked_add(sigs_count)
                        .ok_or_else(|| Error::new(ScriptError::SigCount))?;
                    stack.check_len(i.into())?;

                    // Subset of script starting at the most recent codeseparator, without any
                    // of the signatures.
                    let mut subscript = script.subscript(state.begin_code);
                    for k in 0..sigs_count {
                        subscript = subscript.find_and_delete(stack.rget(usize::from(isig + k) - 1)?);
                    }
                    let script_code = script::Code::from(&subscript);

                    let mut success = true;
                    while success && sigs_count > 0 {
                        let vch_sig = stack.rget(usize::from(isig) - 1)?;
                        let vch_pub_key = stack.rget(usize::from(ikey) - 1)?;

                        // Note how this makes the exact order of pubkey/signature evaluation
                        // distinguishable by CHECKMULTISIG NOT if the STRICTENC flag is set.
                        check_signature_encoding(vch_sig, flags)?;
                        check_pub_key_encoding(vch_pub_key, flags)?;

                        // Check signature
                        let ok = self.checker.check_sig(vch_sig, vch_pub_key, &script_code);

                        if ok {
                            isig += 1;
                            sigs_count -= 1;
                        }
                        ikey += 1;
                        keys_count -= 1;

                        // If there are more signatures left than keys left,
                        // then too many signatures have failed. Exit early,
                        // without checking any further signatures.
                        if sigs_count > keys_count {
                            success = false;
                        };
                    }

                    // Clean up stack of actual arguments
                    for _ in 1..i {
                        stack.pop()?;
                    }

                    // A bug causes CHECKMULTISIG to consume one extra argument
                    // whose contents were not checked in any way.
                    //
                    // Unfortunately this is a potential source of mutability,
                    // so optionally verify it is exactly equal to zero prior
                    // to removing it from the stack.
                    let dummy = stack.pop()?;
                    if flags.contains(Flags::NullDummy) && !dummy.is_empty() {
                        return Err(ScriptError::SigNullDummy.into());
                    }

                    if *op == OP_CHECKMULTISIGVERIFY {
                        if !success {
                            return Err(ScriptError::CheckMultisigVerify.into());
                        }
                    } else {
                        stack.push(cast_from_bool(success));
                    }
                }
            },

            Opcode::Bad(_) => {
                return Err(Error::with_detail(ScriptError::BadOpcode, opcode.to_string()));
            }

            // Rejected before execution.
            Opcode::Disabled(_) => {
                return Err(Error::with_detail(ScriptError::DisabledOpcode, opcode.to_string()));
            }
        }

        Ok(())
    }

    /// Run the signature script, then the output script on the resulting stack, requiring a true
    /// result.
    pub fn eval_scripts(
        &self,
        sig: &Program,
        pub_key: &Program,
        flags: Flags,
    ) -> Result<Stack<Vec<u8>>, Error> {
        let stack = self.eval(Stack::new(), sig, flags)?;
        let stack = self.eval(stack, pub_key, flags)?;
        require_truthy(&stack)?;
        Ok(stack)
    }

    /// The P2SH redemption step: `stack` is the result of the signature script, whose top element
    /// is the serialized redeem script. The redeem script is run on the rest of the stack and must
    /// leave a true value.
    pub fn eval_pay_to_script_hash(
        &self,
        sig: &Program,
        stack: &Stack<Vec<u8>>,
        flags: Flags,
    ) -> Result<Stack<Vec<u8>>, Error> {
        // script_sig must be literals-only or validation fails
        if !sig.is_push_only() {
            return Err(ScriptError::SigPushOnly.into());
        }

        // The stack can’t be empty here, because the output script would have evaluated to false.
        let (redeem_bytes, remaining_stack) = stack.split_last()?;
        let redeem_script = Program::parse(redeem_bytes)?;
        trace!(%redeem_script, "redeeming P2SH");

        let stack = self.eval(remaining_stack, &redeem_script, flags)?;
        require_truthy(&stack)?;
        Ok(stack)
    }

    /// Verify that `sig` satisfies `pub_key` under the effective flags.
    pub fn verify(&self, sig: &Program, pub_key: &Program) -> Result<(), Error> {
        let flags = self.flags();
        self.verify_with_flags(sig, pub_key, flags)
            .inspect_err(|err| debug!(?flags, %err, %sig, %pub_key, "script verification failed"))
    }

    fn verify_with_flags(&self, sig: &Program, pub_key: &Program, flags: Flags) -> Result<(), Error> {
        // Disallow CLEANSTACK without P2SH, because Bitcoin did.
        if flags.contains(Flags::CleanStack) && !flags.contains(Flags::P2SH) {
            return Err(Error::with_detail(
                ScriptError::CleanStack,
                "CLEANSTACK requires P2SH",
            ));
        }

        if flags.contains(Flags::SigPushOnly) && !sig.is_push_only() {
            return Err(ScriptError::SigPushOnly.into());
        }

        if let Some(ext) = self
            .extensions
            .iter()
            .find(|ext| ext.should_handle_scripts(sig, pub_key, flags))
        {
            trace!("an extension is handling verification");
            let stack = ext.handle_scripts(self, sig, pub_key, flags)?;
            return Self::check_clean_stack(&stack, flags);
        }

        let stack = self.eval(Stack::new(), sig, flags)?;
        for ext in &self.extensions {
            ext.did_execute_signature_script(self, sig, flags, &stack)?;
        }

        let p2sh_stack = if flags.contains(Flags::P2SH) {
            Some(stack.clone())
        } else {
            None
        };

        let mut stack = self.eval(stack, pub_key, flags)?;
        require_truthy(&stack)?;

        let mut flow = Flow::Continue;
        for ext in &self.extensions {
            flow = ext.did_execute_output_script(self, pub_key, flags, &mut stack)?;
            if flow == Flow::Handled {
                break;
            }
        }

        // Additional validation for spend-to-script-hash transactions:
        if let Some(p2sh_stack) = p2sh_stack {
            if flow == Flow::Continue && pub_key.is_pay_to_script_hash() {
                stack = self.eval_pay_to_script_hash(sig, &p2sh_stack, flags)?;
            }
        }

        Self::check_clean_stack(&stack, flags)
    }

    // The CLEANSTACK check is only performed after potential P2SH evaluation,
    // as the non-P2SH evaluation of a P2SH script will obviously not result in
    // a clean stack (the P2SH inputs remain).
    fn check_clean_stack(stack: &Stack<Vec<u8>>, flags: Flags) -> Result<(), Error> {
        if flags.contains(Flags::CleanStack) {
            if stack.len() != 1 {
                return Err(Error::with_detail(
                    ScriptError::CleanStack,
                    format!("{} elements remain", stack.len()),
                ));
            }
            // Extensions may hand back a stack that never went through `require_truthy`.
            require_truthy(stack)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use hex::FromHex;
    use proptest::prelude::*;

    use super::*;
    use crate::{
        op,
        opcode::{self, push_value::LargeValue},
        pattern,
    };

    static NULL_CHECKER: NullSignatureChecker = NullSignatureChecker();

    fn interp(flags: Flags) -> ScriptInterpreter<'static> {
        ScriptInterpreter::new(flags, &NULL_CHECKER)
    }

    fn run(script: &[Opcode]) -> Result<Vec<Vec<u8>>, Error> {
        interp(Flags::empty())
            .eval(Stack::new(), &Program(script.to_vec()), Flags::empty())
            .map(Stack::into_vec)
    }

    fn kind<T>(res: Result<T, Error>) -> Option<ScriptError> {
        res.err().map(|err| err.kind())
    }

    /// Accepts any signature for any key, and any lock time.
    struct AcceptingChecker;

    impl SignatureChecker for AcceptingChecker {
        fn check_sig(&self, _sig: &[u8], _pub_key: &[u8], _script_code: &script::Code) -> bool {
            true
        }

        fn check_lock_time(&self, _lock_time: i64) -> bool {
            true
        }
    }

    #[test]
    fn truthiness() {
        assert!(!cast_to_bool(&[]));
        assert!(!cast_to_bool(&[0, 0, 0]));
        assert!(!cast_to_bool(&[0x80]));
        assert!(!cast_to_bool(&[0, 0, 0x80]));
        assert!(cast_to_bool(&[0x80, 0]));
        assert!(cast_to_bool(&[0, 1]));
        assert!(cast_to_bool(&[1]));
    }

    #[test]
    fn stack_indexing() {
        let mut stack = Stack::from(vec![1, 2, 3, 4]);
        assert_eq!(stack.rget(0), Ok(&4));
        assert_eq!(stack.rget(3), Ok(&1));
        assert!(stack.rget(4).is_err());

        stack.move_to_top(3).expect("in range");
        assert_eq!(stack.clone().into_vec(), vec![2, 3, 4, 1]);
        stack.rinsert(2, 9).expect("in range");
        assert_eq!(stack.clone().into_vec(), vec![2, 3, 9, 4, 1]);
        assert_eq!(stack.rremove(4), Ok(2));
        stack.repush(1).expect("in range");
        assert_eq!(stack.into_vec(), vec![3, 9, 4, 1, 4]);

        let mut empty: Stack<u8> = Stack::new();
        assert_eq!(
            empty.pop().map_err(|err| err.kind()),
            Err(ScriptError::InvalidStackOperation)
        );
    }

    #[test]
    fn stack_shuffling() {
        let items = [op::_1, op::_2, op::_3, op::_4, op::_5, op::_6];
        let nums = |ns: &[u8]| ns.iter().map(|n| vec![*n]).collect::<Vec<_>>();

        assert_eq!(run(&[&items[..], &[op::_2ROT]].concat()), Ok(nums(&[3, 4, 5, 6, 1, 2])));
        assert_eq!(run(&[&items[..4], &[op::_2SWAP]].concat()), Ok(nums(&[3, 4, 1, 2])));
        assert_eq!(run(&[&items[..3], &[op::ROT]].concat()), Ok(nums(&[2, 3, 1])));
        assert_eq!(run(&[&items[..2], &[op::TUCK]].concat()), Ok(nums(&[2, 1, 2])));
        assert_eq!(run(&[&items[..4], &[op::_2OVER]].concat()), Ok(nums(&[1, 2, 3, 4, 1, 2])));
        assert_eq!(run(&[&items[..3], &[op::_2, op::ROLL]].concat()), Ok(nums(&[2, 3, 1])));
        assert_eq!(run(&[&items[..3], &[op::_2, op::PICK]].concat()), Ok(nums(&[1, 2, 3, 1])));
        assert_eq!(
            kind(run(&[op::_1, op::_1, op::PICK])),
            Some(ScriptError::InvalidStackOperation)
        );
        assert_eq!(
            kind(run(&[op::_1, op::FROMALTSTACK])),
            Some(ScriptError::InvalidAltstackOperation)
        );
    }

    #[test]
    fn arithmetic() {
        assert_eq!(run(&[op::_2, op::_3, op::ADD]), Ok(vec![vec![5]]));
        assert_eq!(run(&[op::_2, op::_3, op::SUB]), Ok(vec![vec![0x81]]));
        assert_eq!(run(&[op::_1NEGATE, op::ABS]), Ok(vec![vec![1]]));
        assert_eq!(run(&[op::_0, op::NOT]), Ok(vec![vec![1]]));
        assert_eq!(run(&[op::_5, op::_2, op::_6, op::WITHIN]), Ok(vec![vec![1]]));
        assert_eq!(run(&[op::_6, op::_2, op::_6, op::WITHIN]), Ok(vec![vec![]]));

        // results may exceed the operand range, but can’t be used as operands again
        let max = op::push_value(&[0xff, 0xff, 0xff, 0x7f]).expect("fits");
        assert_eq!(
            run(&[max.clone(), max.clone(), op::ADD]),
            Ok(vec![vec![0xfe, 0xff, 0xff, 0xff, 0x00]])
        );
        assert_eq!(
            kind(run(&[max.clone(), max, op::ADD, op::_1, op::ADD])),
            Some(ScriptError::ScriptNum)
        );
    }

    #[test]
    fn wide_operands_dont_panic() {
        let i64_max = op::push_value(&[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x7f]).expect("fits");
        let wide = interp(Flags::empty()).with_limits(Limits::default().with_max_num_size(8));
        assert_eq!(
            kind(wide.eval(
                Stack::new(),
                &Program(vec![i64_max, op::_1ADD]),
                Flags::empty()
            )),
            Some(ScriptError::ScriptNum)
        );
    }

    #[test]
    fn hashes() {
        let sha256_empty =
            <Vec<u8>>::from_hex("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
                .expect("valid hex");
        assert_eq!(run(&[op::_0, op::SHA256]), Ok(vec![sha256_empty]));
        assert_eq!(
            run(&[op::_1, op::HASH160]),
            Ok(vec![pattern::hash160(&[1]).to_vec()])
        );
        assert_eq!(run(&[op::_0, op::SHA1]).map(|s| s[0].len()), Ok(20));
        assert_eq!(run(&[op::_0, op::HASH256]).map(|s| s[0].len()), Ok(32));
    }

    #[test]
    fn conditionals() {
        let thn_els = pattern::branch(&[op::_2], &[op::_3]);
        assert_eq!(run(&[&[op::_1], &thn_els[..]].concat()), Ok(vec![vec![2]]));
        assert_eq!(run(&[&[op::_0], &thn_els[..]].concat()), Ok(vec![vec![3]]));
        assert_eq!(
            kind(run(&[op::_1, op::IF])),
            Some(ScriptError::UnbalancedConditional)
        );
        assert_eq!(kind(run(&[op::ENDIF])), Some(ScriptError::UnbalancedConditional));
        assert_eq!(kind(run(&[op::IF])), Some(ScriptError::UnbalancedConditional));
    }

    #[test]
    fn unexecuted_opcodes() {
        // disabled opcodes fail anywhere
        assert_eq!(
            kind(run(&[op::_0, op::IF, Opcode::Disabled(opcode::Disabled::OP_CAT), op::ENDIF])),
            Some(ScriptError::DisabledOpcode)
        );
        // so do OP_VERIF and OP_VERNOTIF
        assert_eq!(
            kind(run(&[op::_0, op::IF, Opcode::Bad(opcode::Bad::OP_VERIF), op::ENDIF])),
            Some(ScriptError::BadOpcode)
        );
        // but other bad opcodes only fail when run
        assert_eq!(
            run(&[op::_0, op::IF, Opcode::Bad(opcode::Bad::OP_VER), op::ENDIF, op::_1]),
            Ok(vec![vec![1]])
        );
        assert_eq!(
            kind(run(&[Opcode::Bad(opcode::Bad::OP_VER)])),
            Some(ScriptError::BadOpcode)
        );
        assert_eq!(
            run(&[op::_0, op::IF, op::RETURN, op::ENDIF]),
            Ok(vec![])
        );
        assert_eq!(kind(run(&[op::RETURN])), Some(ScriptError::OpReturn));
    }

    #[test]
    fn op_count_limit() {
        let nops = vec![op::NOP; MAX_OP_COUNT];
        assert_eq!(run(&nops), Ok(vec![]));
        assert_eq!(
            kind(run(&[&nops[..], &[op::NOP]].concat())),
            Some(ScriptError::OpCount)
        );
        // pushes don’t count, even in an unexecuted branch
        let pushes = vec![op::_1; MAX_OP_COUNT + 1];
        assert!(run(&pushes).is_ok());
    }

    #[test]
    fn stack_size_limit() {
        let items = vec![op::_1; MAX_STACK_DEPTH];
        assert!(run(&items).is_ok());
        assert_eq!(
            kind(run(&[&items[..], &[op::DUP]].concat())),
            Some(ScriptError::StackSize)
        );
        assert_eq!(
            kind(run(&[&items[..], &[op::TOALTSTACK, op::DUP, op::DUP]].concat())),
            Some(ScriptError::StackSize)
        );
    }

    #[test]
    fn push_and_script_size_limits() {
        let big = op::pushdata2(vec![0; MAX_SCRIPT_ELEMENT_SIZE + 1]);
        assert_eq!(kind(run(&[big])), Some(ScriptError::PushSize));

        let huge = vec![op::NOP; MAX_SCRIPT_SIZE + 1];
        assert_eq!(kind(run(&huge)), Some(ScriptError::ScriptSize));
    }

    #[test]
    fn malformed_direct_pushes_are_rejected() {
        let overlong = Opcode::PushValue(PushValue::LargeValue(LargeValue::PushdataBytelength(
            vec![1; 100],
        )));
        assert_eq!(kind(run(&[overlong])), Some(ScriptError::BadOpcode));

        let empty = Opcode::PushValue(PushValue::LargeValue(LargeValue::PushdataBytelength(vec![])));
        assert_eq!(kind(run(&[empty, op::_1])), Some(ScriptError::BadOpcode));
    }

    #[test]
    fn minimal_data() {
        let padded = Program::parse(&[0x4c, 0x01, 0x07]).expect("parses");
        let strict = interp(Flags::MinimalData);
        assert_eq!(
            kind(strict.eval(Stack::new(), &padded, Flags::MinimalData)),
            Some(ScriptError::MinimalData)
        );
        assert!(strict.eval(Stack::new(), &padded, Flags::empty()).is_ok());

        // numbers must be minimally encoded too
        let script = Program::parse(&[0x02, 0x01, 0x00, op::_1ADD.into()]).expect("parses");
        assert_eq!(
            kind(strict.eval(Stack::new(), &script, Flags::MinimalData)),
            Some(ScriptError::ScriptNum)
        );
    }

    #[test]
    fn upgradable_nops() {
        let script = Program(vec![op::NOP1, op::CHECKLOCKTIMEVERIFY, op::_1]);
        assert!(interp(Flags::empty()).run(&script).is_ok());
        assert_eq!(
            kind(interp(Flags::DiscourageUpgradableNOPs).run(&script)),
            Some(ScriptError::DiscourageUpgradableNOPs)
        );
        // unexecuted NOPs are fine
        assert!(interp(Flags::DiscourageUpgradableNOPs)
            .run(&Program(vec![op::_0, op::IF, op::NOP10, op::ENDIF]))
            .is_ok());
    }

    #[test]
    fn lock_time() {
        let checker = AcceptingChecker;
        let cltv = ScriptInterpreter::new(Flags::CHECKLOCKTIMEVERIFY, &checker);
        assert!(cltv
            .run(&Program(pattern::check_lock_time_verify(500_000_000).to_vec()))
            .is_ok());
        assert_eq!(
            kind(cltv.run(&Program(vec![op::_1NEGATE, op::CHECKLOCKTIMEVERIFY]))),
            Some(ScriptError::NegativeLockTime)
        );
        assert_eq!(
            kind(cltv.run(&Program(vec![op::CHECKLOCKTIMEVERIFY]))),
            Some(ScriptError::InvalidStackOperation)
        );
        // five-byte lock times are accepted
        let five = op::push_value(&[0, 0, 0, 0, 1]).expect("fits");
        assert!(cltv.run(&Program(vec![five])).is_ok());
        assert!(cltv
            .run(&Program(vec![
                op::push_value(&[0, 0, 0, 0, 1]).expect("fits"),
                op::CHECKLOCKTIMEVERIFY
            ]))
            .is_ok());

        assert_eq!(
            kind(interp(Flags::CHECKLOCKTIMEVERIFY).run(&Program(vec![op::_1, op::CHECKLOCKTIMEVERIFY]))),
            Some(ScriptError::UnsatisfiedLockTime)
        );
    }

    #[cfg(feature = "signature-validation")]
    #[test]
    fn callback_lock_time_comparison() {
        let sighash = |_: &script::Code, _: u8| -> Option<[u8; SIGHASH_SIZE]> { None };
        let checker = CallbackSignatureChecker {
            sighash: &sighash,
            lock_time: 100,
            is_final: false,
        };
        assert!(checker.check_lock_time(100));
        assert!(checker.check_lock_time(0));
        assert!(!checker.check_lock_time(101));
        assert!(!checker.check_lock_time(LOCKTIME_THRESHOLD));

        let by_time = CallbackSignatureChecker {
            lock_time: LOCKTIME_THRESHOLD + 10,
            ..checker
        };
        assert!(by_time.check_lock_time(LOCKTIME_THRESHOLD));
        assert!(!by_time.check_lock_time(100));

        let finalized = CallbackSignatureChecker {
            is_final: true,
            ..checker
        };
        assert!(!finalized.check_lock_time(0));
    }

    #[test]
    fn multisig_bookkeeping() {
        let checker = AcceptingChecker;
        let accepting = ScriptInterpreter::new(Flags::empty(), &checker);
        let key = vec![2; 33];
        let sig = vec![0x30; 9];
        let multisig = pattern::check_multisig(1, &[&key, &key], false).expect("valid");

        let stack = accepting
            .eval(
                Stack::from(vec![vec![], sig.clone()]),
                &multisig,
                Flags::empty(),
            )
            .expect("evaluates");
        assert_eq!(stack.into_vec(), vec![vec![1]]);

        // the dummy element is required
        assert_eq!(
            kind(accepting.eval(Stack::from(vec![sig.clone()]), &multisig, Flags::empty())),
            Some(ScriptError::InvalidStackOperation)
        );

        // and it must be empty with NullDummy
        assert_eq!(
            kind(accepting.eval(
                Stack::from(vec![vec![0], sig.clone()]),
                &multisig,
                Flags::NullDummy
            )),
            Some(ScriptError::SigNullDummy)
        );

        // the keys count toward the op limit
        let mut state = State::initial(Stack::from(vec![vec![], sig, key.clone(), key, vec![2]]));
        state.op_count = MAX_OP_COUNT - 2;
        assert_eq!(
            kind(accepting.eval_step(&op::CHECKMULTISIG, 0, &Program::default(), Flags::empty(), &mut state)),
            Some(ScriptError::OpCount)
        );
    }

    #[test]
    fn multisig_counts() {
        let too_many_keys = Program(vec![op::_0, op::push_value(&[21]).expect("fits"), op::CHECKMULTISIG]);
        assert_eq!(kind(run(&too_many_keys.0)), Some(ScriptError::PubKeyCount));

        let negative_keys = Program(vec![op::_0, op::_2, op::_1NEGATE, op::CHECKMULTISIG]);
        assert_eq!(kind(run(&negative_keys.0)), Some(ScriptError::PubKeyCount));

        let key: &[u8] = &[2; 33];
        let more_sigs_than_keys = Program(vec![
            op::_0,
            op::_2,
            op::push_value(key).expect("fits"),
            op::_1,
            op::CHECKMULTISIG,
        ]);
        assert_eq!(kind(run(&more_sigs_than_keys.0)), Some(ScriptError::SigCount));
    }

    #[test]
    fn checksig_encoding_checks() {
        let checker = AcceptingChecker;
        let key = vec![2; 33];
        let not_der = vec![0x30, 0x01];
        let script = pattern::pay_to_pubkey(&key);

        let lax = ScriptInterpreter::new(Flags::empty(), &checker);
        assert!(lax.eval(Stack::from(vec![not_der.clone()]), &script, Flags::empty()).is_ok());

        let der = ScriptInterpreter::new(Flags::DerSig, &checker);
        assert_eq!(
            kind(der.eval(Stack::from(vec![not_der]), &script, Flags::DerSig)),
            Some(ScriptError::SigDER)
        );

        // the empty signature is always allowed through to the checker
        assert!(der.eval(Stack::from(vec![vec![]]), &script, Flags::DerSig).is_ok());

        let bad_key = pattern::pay_to_pubkey(&[5; 33]);
        assert_eq!(
            kind(der.eval(Stack::from(vec![vec![]]), &bad_key, Flags::StrictEnc)),
            Some(ScriptError::PubKeyType)
        );
        assert!(der.eval(Stack::from(vec![vec![]]), &bad_key, Flags::DerSig).is_ok());
    }

    /// Records the subscript it was asked to check.
    struct RecordingChecker(core::cell::RefCell<Vec<script::Code>>);

    impl SignatureChecker for RecordingChecker {
        fn check_sig(&self, _sig: &[u8], _pub_key: &[u8], script_code: &script::Code) -> bool {
            self.0.borrow_mut().push(script_code.clone());
            true
        }
    }

    #[test]
    fn subscript_follows_code_separator() {
        let checker = RecordingChecker(Default::default());
        let recording = ScriptInterpreter::new(Flags::empty(), &checker);
        let sig = vec![0x30; 9];
        let key = vec![2; 33];
        let sig_push = op::push_value(&sig).expect("fits");
        let key_push = op::push_value(&key).expect("fits");
        let script = Program(vec![
            op::NOP,
            op::CODESEPARATOR,
            sig_push.clone(),
            op::DROP,
            sig_push,
            key_push.clone(),
            op::CHECKSIG,
        ]);
        recording
            .eval(Stack::new(), &script, Flags::empty())
            .expect("evaluates");
        assert_eq!(
            checker.0.borrow().as_slice(),
            &[script::Code::from(&Program(vec![op::DROP, key_push, op::CHECKSIG]))]
        );
    }

    #[test]
    fn verify_requires_a_true_result() {
        let i = interp(Flags::empty());
        assert!(i.verify(&Program(vec![op::_1]), &Program::default()).is_ok());
        assert_eq!(
            kind(i.verify(&Program(vec![op::_0]), &Program::default())),
            Some(ScriptError::EvalFalse)
        );
        assert_eq!(
            kind(i.verify(&Program::default(), &Program::default())),
            Some(ScriptError::EvalFalse)
        );
        assert_eq!(
            kind(interp(Flags::SigPushOnly).verify(&Program(vec![op::_1, op::DUP]), &Program::default())),
            Some(ScriptError::SigPushOnly)
        );
        // conditionals can’t span the two scripts
        assert_eq!(
            kind(i.verify(&Program(vec![op::_1, op::IF]), &Program(vec![op::ENDIF, op::_1]))),
            Some(ScriptError::UnbalancedConditional)
        );
    }

    #[test]
    fn verify_pay_to_script_hash() {
        let redeem = Program(vec![op::_2, op::EQUAL]);
        let pub_key = pattern::pay_to_script_hash(&redeem);
        let sig = Program(vec![op::_2, pattern::push_script(&redeem).map(Opcode::PushValue).expect("fits")]);

        assert!(interp(Flags::P2SH).verify(&sig, &pub_key).is_ok());
        assert!(interp(Flags::P2SH | Flags::CleanStack).verify(&sig, &pub_key).is_ok());

        let wrong = Program(vec![op::_3, pattern::push_script(&redeem).map(Opcode::PushValue).expect("fits")]);
        assert_eq!(
            kind(interp(Flags::P2SH).verify(&wrong, &pub_key)),
            Some(ScriptError::EvalFalse)
        );
        // without P2SH, only the hash is checked
        assert!(interp(Flags::empty()).verify(&wrong, &pub_key).is_ok());

        let extra = Program([&[op::_1], &sig.0[..]].concat());
        assert!(interp(Flags::P2SH).verify(&extra, &pub_key).is_ok());
        assert_eq!(
            kind(interp(Flags::P2SH | Flags::CleanStack).verify(&extra, &pub_key)),
            Some(ScriptError::CleanStack)
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(2_000))]

        #[test]
        fn never_panics(
            sig in prop::collection::vec(any::<u8>(), 0..=100),
            pub_key in prop::collection::vec(any::<u8>(), 0..=100),
            flag_bits in any::<u32>(),
        ) {
            let flags = crate::testing::repair_flags(Flags::from_bits_truncate(flag_bits));
            if let (Ok(sig), Ok(pub_key)) = (Program::parse(&sig), Program::parse(&pub_key)) {
                let _ = interp(flags).verify(&sig, &pub_key);
            }
        }
    }
}
