//! Editable instruction programs.
//!
//! A [`Program`] is what transpilers and scaffolding operate on: an ordered list of
//! [`Item`]s (instructions and label positions) plus the declared parameter names. Local
//! variables are referenced by name; the assembler decides slots.

use crate::instruction::{Instruction, Item, Label};
use std::fmt;
use std::ops::{Index, IndexMut};
use std::rc::Rc;

/// Ordered, editable instruction list of one function.
#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    name: Rc<str>,
    argnames: Vec<Rc<str>>,
    items: Vec<Item>,
    next_label: u32,
}

impl Program {
    /// Creates an empty program for a function with the given parameters.
    pub fn new<I, S>(name: impl AsRef<str>, argnames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            name: Rc::from(name.as_ref()),
            argnames: argnames
                .into_iter()
                .map(|arg| Rc::from(arg.as_ref()))
                .collect(),
            items: Vec::new(),
            next_label: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn name_rc(&self) -> Rc<str> {
        self.name.clone()
    }

    /// Declared parameter names, in call order.
    pub fn argnames(&self) -> &[Rc<str>] {
        &self.argnames
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut Vec<Item> {
        &mut self.items
    }

    /// Number of items, labels included.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Mints a label that is unique within this program.
    pub fn new_label(&mut self) -> Label {
        let label = Label(self.next_label);
        self.next_label += 1;
        label
    }

    pub fn push(&mut self, item: impl Into<Item>) {
        self.items.push(item.into());
    }

    pub fn insert(&mut self, index: usize, item: impl Into<Item>) {
        self.items.insert(index, item.into());
    }

    pub fn remove(&mut self, index: usize) -> Item {
        self.items.remove(index)
    }

    /// Inserts `items` in order at the very start of the program.
    pub fn prepend<I: IntoIterator<Item = Item>>(&mut self, items: I) {
        self.items.splice(0..0, items);
    }

    /// Iterates over instructions only, skipping label positions.
    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.items.iter().filter_map(Item::as_instruction)
    }

    pub fn instructions_mut(&mut self) -> impl Iterator<Item = &mut Instruction> {
        self.items.iter_mut().filter_map(Item::as_instruction_mut)
    }

    /// Number of instructions, labels excluded.
    pub fn instruction_count(&self) -> usize {
        self.instructions().count()
    }

    /// Every local name: parameters first, then other locals in order of first reference.
    pub fn varnames(&self) -> Vec<Rc<str>> {
        let mut names: Vec<Rc<str>> = self.argnames.clone();
        for local in self.instructions().filter_map(Instruction::local) {
            if !names.iter().any(|known| known == local) {
                names.push(local.clone());
            }
        }
        names
    }
}

impl Extend<Item> for Program {
    fn extend<T: IntoIterator<Item = Item>>(&mut self, iter: T) {
        self.items.extend(iter);
    }
}

impl Index<usize> for Program {
    type Output = Item;

    fn index(&self, index: usize) -> &Item {
        &self.items[index]
    }
}

impl IndexMut<usize> for Program {
    fn index_mut(&mut self, index: usize) -> &mut Item {
        &mut self.items[index]
    }
}

impl fmt::Display for Program {
    /// Prints the program in the format `parse_assembly` reads.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<&str> = self.argnames.iter().map(|a| a.as_ref()).collect();
        writeln!(f, "fn {}({})", self.name, args.join(", "))?;
        for item in &self.items {
            match item {
                Item::Instr(ins) => writeln!(f, "    {ins}")?,
                Item::Label(label) => writeln!(f, "{label}:")?,
            }
        }
        Ok(())
    }
}
