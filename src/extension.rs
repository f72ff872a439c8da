//! Hooks that let callers change how [`ScriptInterpreter::verify`] treats particular scripts or
//! opcodes, without touching the interpreter.
//!
//! Every hook receives the interpreter and the state it may act on explicitly. Hooks run in the
//! order the extensions were added to the interpreter.

use core::cell::RefCell;

use tracing::trace;

use crate::{
    interpreter::{self, Flags, ScriptInterpreter, SignatureChecker, Stack, State},
    opcode::{Opcode, Operation},
    script::Program,
    script_error::Error,
};

/// Whether verification should carry on with its remaining built-in steps.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// The extension has done the rest of the work, so the built-in P2SH step is skipped.
    Handled,
}

pub trait Extension {
    /// Flags that are always in effect while this extension is installed.
    fn extra_flags(&self) -> Flags {
        Flags::empty()
    }

    /// Whether this extension takes over verification of the whole pair of scripts.
    fn should_handle_scripts(&self, _sig: &Program, _pub_key: &Program, _flags: Flags) -> bool {
        false
    }

    /// Verify the pair of scripts, returning the final stack. Only the clean stack check is applied
    /// afterward.
    fn handle_scripts(
        &self,
        interp: &ScriptInterpreter<'_>,
        sig: &Program,
        pub_key: &Program,
        flags: Flags,
    ) -> Result<Stack<Vec<u8>>, Error> {
        interp.eval_scripts(sig, pub_key, flags)
    }

    fn did_execute_signature_script(
        &self,
        _interp: &ScriptInterpreter<'_>,
        _sig: &Program,
        _flags: Flags,
        _stack: &Stack<Vec<u8>>,
    ) -> Result<(), Error> {
        Ok(())
    }

    /// Called once the output script has left a true value. `stack` is what the clean stack check
    /// will see, so an extension that replaces the remaining steps should update it.
    fn did_execute_output_script(
        &self,
        _interp: &ScriptInterpreter<'_>,
        _pub_key: &Program,
        _flags: Flags,
        _stack: &mut Stack<Vec<u8>>,
    ) -> Result<Flow, Error> {
        Ok(Flow::Continue)
    }

    /// Whether this extension executes `op` in place of the interpreter. Only consulted for
    /// opcodes in active branches; control opcodes in inactive branches always go to the
    /// interpreter.
    fn should_handle_opcode(&self, _op: &Opcode, _flags: Flags) -> bool {
        false
    }

    fn handle_opcode(
        &self,
        _interp: &ScriptInterpreter<'_>,
        _op: &Opcode,
        _flags: Flags,
        _state: &mut State,
    ) -> Result<(), Error> {
        Ok(())
    }
}

/// Pay-to-script-hash as an extension. It remembers the signature script’s result, then redeems
/// the script itself once a P2SH output script succeeds.
#[derive(Debug, Default)]
pub struct P2shExtension {
    signature_script: RefCell<Option<(Program, Stack<Vec<u8>>)>>,
}

impl P2shExtension {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Extension for P2shExtension {
    fn extra_flags(&self) -> Flags {
        Flags::P2SH
    }

    fn did_execute_signature_script(
        &self,
        _interp: &ScriptInterpreter<'_>,
        sig: &Program,
        _flags: Flags,
        stack: &Stack<Vec<u8>>,
    ) -> Result<(), Error> {
        *self.signature_script.borrow_mut() = Some((sig.clone(), stack.clone()));
        Ok(())
    }

    fn did_execute_output_script(
        &self,
        interp: &ScriptInterpreter<'_>,
        pub_key: &Program,
        flags: Flags,
        stack: &mut Stack<Vec<u8>>,
    ) -> Result<Flow, Error> {
        let cached = self.signature_script.borrow_mut().take();
        match cached {
            Some((sig, sig_stack))
                if flags.contains(Flags::P2SH) && pub_key.is_pay_to_script_hash() =>
            {
                trace!("redeeming P2SH in an extension");
                *stack = interp.eval_pay_to_script_hash(&sig, &sig_stack, flags)?;
                Ok(Flow::Handled)
            }
            _ => Ok(Flow::Continue),
        }
    }
}

/// `OP_CHECKLOCKTIMEVERIFY` as an extension, checking lock times against its own checker rather
/// than the interpreter’s.
pub struct CltvExtension<'a> {
    checker: &'a dyn SignatureChecker,
}

impl<'a> CltvExtension<'a> {
    pub fn new(checker: &'a dyn SignatureChecker) -> Self {
        CltvExtension { checker }
    }
}

impl Extension for CltvExtension<'_> {
    fn extra_flags(&self) -> Flags {
        Flags::CHECKLOCKTIMEVERIFY
    }

    fn should_handle_opcode(&self, op: &Opcode, flags: Flags) -> bool {
        *op == Opcode::Operation(Operation::OP_CHECKLOCKTIMEVERIFY)
            && flags.contains(Flags::CHECKLOCKTIMEVERIFY)
    }

    fn handle_opcode(
        &self,
        _interp: &ScriptInterpreter<'_>,
        _op: &Opcode,
        flags: Flags,
        state: &mut State,
    ) -> Result<(), Error> {
        interpreter::check_lock_time_verify(state.stack(), flags, self.checker)
    }
}
