#![cfg(test)]

mod harness;
