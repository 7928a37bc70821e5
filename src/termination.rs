// Copyright 2020 Xavier Gillard
//
// Permission is hereby granted, free of charge, to any person obtaining a copy of
// this software and associated documentation files (the "Software"), to deal in
// the Software without restriction, including without limitation the rights to
// use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software is furnished to do so,
// subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS
// FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR
// COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER
// IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
// CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! This module provides the cooperative termination side channel. Every
//! worker samples the flag at the top of each iteration, so the worst-case
//! stop latency is one full iteration (one construct plus one evaluate).

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use signal_hook::consts::{SIGINT, SIGTERM};

/// A cloneable cooperative stop flag shared between the coordinator, its
/// workers, and (optionally) a signal handler. Reads and writes are relaxed:
/// a stale read merely delays the stop by one iteration, which is
/// acceptable, and the flag is only ever flipped from false to true.
#[derive(Debug, Clone, Default)]
pub struct TerminationFlag(Arc<AtomicBool>);

impl TerminationFlag {
    /// Creates a new, unset flag.
    pub fn new() -> Self {
        Self::default()
    }
    /// Returns true iff a stop has been requested.
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
    /// Requests a cooperative stop of every worker sharing this flag.
    pub fn set(&self) {
        self.0.store(true, Ordering::Relaxed)
    }
    /// Arranges for the flag to be raised upon receipt of SIGINT or SIGTERM.
    /// The mapper itself never installs handlers; embedders that own their
    /// signal handling simply do not call this.
    pub fn install_signal_handler(&self) -> io::Result<()> {
        signal_hook::flag::register(SIGINT,  Arc::clone(&self.0))?;
        signal_hook::flag::register(SIGTERM, Arc::clone(&self.0))?;
        Ok(())
    }
}


// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_termination_flag {
    use crate::termination::TerminationFlag;

    #[test]
    fn a_fresh_flag_is_unset() {
        assert!(!TerminationFlag::new().is_set());
    }
    #[test]
    fn setting_the_flag_is_visible_through_every_clone() {
        let flag  = TerminationFlag::new();
        let clone = flag.clone();
        flag.set();
        assert!(clone.is_set());
    }
}
