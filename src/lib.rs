//! # Pollard
//! A dynamic hash accumulator representing a large set of 32-byte elements by a
//! handful of Merkle roots. Elements can be added and removed, membership is
//! shown with compact inclusion proofs, and the most recent batch of changes
//! can be rolled back. The design follows the
//! [utreexo](https://eprint.iacr.org/2019/611.pdf) accumulator: the set lives
//! in a forest of perfect binary trees, and a node that only needs to *verify*
//! membership can do so holding nothing but the roots.
//!
//! The [accumulator] module has the two flavors: [accumulator::pollard::Pollard]
//! keeps (part of) the forest in memory and can both prove and verify, while
//! [accumulator::stump::Stump] keeps only the roots and can verify and update.
pub mod accumulator;
