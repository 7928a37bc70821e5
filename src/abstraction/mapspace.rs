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

//! This module defines the traits describing the space of candidate
//! mappings: `MapSpace` for the whole space and `Subspace` for the disjoint
//! pieces it is partitioned into, one per worker.

use crate::common::MappingId;

/// One piece of a partitioned mapping space. A subspace owns a dense id
/// domain, but the mappings behind those ids are anything but dense in
/// legality: `construct` is allowed to fail for arbitrary ids.
pub trait Subspace {
    /// The concrete mapping type this subspace materializes.
    type Mapping: Clone + Send;

    /// The number of ids in this subspace's domain.
    fn size(&self) -> u128;

    /// Materializes the mapping behind the given id, or None when the id
    /// does not denote a legal mapping.
    fn construct(&self, id: MappingId) -> Option<Self::Mapping>;
}

/// The full space of candidate mappings of one workload onto one topology.
/// The framework never enumerates a `MapSpace` directly: it splits it once
/// and hands each resulting subspace to a dedicated worker.
pub trait MapSpace {
    /// The concrete mapping type this space materializes.
    type Mapping: Clone + Send;
    /// The type of the pieces `split` produces.
    type Subspace: Subspace<Mapping = Self::Mapping> + Send + Sync;

    /// The number of ids in the whole space.
    fn size(&self) -> u128;

    /// Partitions the space into (up to) `nb_splits` subspaces whose id
    /// domains are pairwise disjoint and jointly cover the whole space, so
    /// every id is visited by at most one worker.
    fn split(&self, nb_splits: usize) -> Vec<Self::Subspace>;
}
