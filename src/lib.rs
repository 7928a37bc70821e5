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

//! # MAPSEARCH
//! Mapsearch is a generic framework to search the space of possible mappings
//! of a computational workload onto a hierarchical hardware topology. You
//! describe the cost model of your hardware (see `CostEngine`), the space of
//! candidate mappings (see `MapSpace`) and a strategy to enumerate that space
//! (see `SearchAlgorithm`); the framework takes care of partitioning the
//! space across threads, driving the staged evaluation of every candidate,
//! ranking candidates under one or more optimization metrics, and converging
//! on the globally best mapping.
//!
//! Because the space of *legal* mappings is typically sparse, the framework
//! treats rejected candidates as ordinary data: it counts them, throttles
//! hopeless searches with a consecutive-invalid timeout, and can keep one
//! sample rejected mapping per topology level for post-mortem diagnostics.
//!
//! ## Side benefit
//! As a side benefit from using mapsearch, you will be able to exploit all
//! of your hardware threads to explore the mapping space in parallel.
pub mod common;
pub mod config;
pub mod error;
pub mod termination;
pub mod abstraction;
pub mod implementation;

#[cfg(test)]
pub mod test_utils;
