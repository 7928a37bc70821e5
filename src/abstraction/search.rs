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

//! This module defines the `SearchAlgorithm` trait: a stateful cursor that
//! decides in which order one worker walks its subspace.

use crate::common::{MappingId, SearchStatus};

/// A stateful cursor over one subspace. Each worker owns exactly one cursor,
/// so implementations never need to worry about concurrent callers; the
/// `next`/`report` calls of one worker are serialized by construction.
pub trait SearchAlgorithm {
    /// Yields the next mapping id to try, or None iff the cursor considers
    /// its subspace exhausted (which terminates the owning worker).
    fn next(&mut self) -> Option<MappingId>;

    /// Feeds back what became of the id this cursor last handed out. The
    /// `cost` is only provided on `SearchStatus::Success` and is computed
    /// under the highest-priority optimization metric.
    fn report(&mut self, status: SearchStatus, cost: Option<f64>);
}
