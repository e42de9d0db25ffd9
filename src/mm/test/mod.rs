//! Testes do subsistema de memória.

mod aspace_test;
