//! Host runtime tests: assembly text, the code round trip and the interpreter.

mod runtime;
