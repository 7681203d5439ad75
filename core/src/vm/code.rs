use core::fmt;

use hashbrown::{HashMap, HashSet};

use super::Instruction;

/// The compiled form of one function, shared by every call to it.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameTemplate {
    pub name: String,
    /// Number of arguments moved from the caller's operand stack on `call`.
    pub arity: usize,
    pub instructions: Vec<Instruction>,
    /// Deepest operand stack the instructions can reach. Capacity hint only.
    pub max_stack_size: usize,
}

impl FrameTemplate {
    pub fn new(name: impl Into<String>, arity: usize, instructions: Vec<Instruction>) -> Self {
        Self {
            name: name.into(),
            arity,
            instructions,
            max_stack_size: arity,
        }
    }

    pub fn with_max_stack_size(mut self, max_stack_size: usize) -> Self {
        self.max_stack_size = max_stack_size;
        self
    }

    /// Jump targets in address order; a target's position is its label number.
    fn jump_targets(&self) -> Vec<usize> {
        let targets: HashSet<usize> = self
            .instructions
            .iter()
            .filter_map(Instruction::jump_target)
            .collect();
        let mut sorted: Vec<_> = targets.into_iter().collect();
        sorted.sort_unstable();
        sorted
    }
}

/// Frame templates of a program, keyed by function name.
///
/// Iteration and the textual dump follow registration order.
#[derive(Debug, Clone, Default)]
pub struct Code {
    templates: Vec<FrameTemplate>,
    by_name: HashMap<String, usize>,
}

impl Code {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template. A template with the same name is replaced in place.
    pub fn add(&mut self, template: FrameTemplate) {
        match self.by_name.get(&template.name) {
            Some(&index) => self.templates[index] = template,
            None => {
                self.by_name
                    .insert(template.name.clone(), self.templates.len());
                self.templates.push(template);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&FrameTemplate> {
        self.by_name.get(name).map(|&index| &self.templates[index])
    }

    pub fn iter(&self) -> impl Iterator<Item = &FrameTemplate> {
        self.templates.iter()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// Deterministic dump: a header per frame, then one line per instruction with
/// its index, its label if something jumps there, and the instruction.
impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, template) in self.templates.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "frame {} (arity {})", template.name, template.arity)?;

            let label_map: HashMap<usize, usize> = template
                .jump_targets()
                .into_iter()
                .enumerate()
                .map(|(label, addr)| (addr, label))
                .collect();

            for (addr, instr) in template.instructions.iter().enumerate() {
                let label_prefix = label_map
                    .get(&addr)
                    .map(|label| format!("L{}:", label))
                    .unwrap_or_default();

                match instr.jump_target() {
                    Some(target) => {
                        let target_label = label_map
                            .get(&target)
                            .map(|label| format!("L{}", label))
                            .unwrap_or_else(|| format!("@{}", target));
                        writeln!(
                            f,
                            "    {:4} {:>4}  {} (to {})",
                            addr, label_prefix, instr, target_label
                        )?;
                    }
                    None => writeln!(f, "    {:4} {:>4}  {}", addr, label_prefix, instr)?,
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::Constant;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_registration_order_and_replacement() {
        let mut code = Code::new();
        code.add(FrameTemplate::new("main", 0, vec![Instruction::Nop]));
        code.add(FrameTemplate::new("helper", 1, vec![]));
        code.add(FrameTemplate::new("main", 0, vec![Instruction::Pop]));

        let names: Vec<_> = code.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["main", "helper"]);
        assert_eq!(code.get("main").unwrap().instructions, vec![Instruction::Pop]);
        assert!(code.get("missing").is_none());
        assert_eq!(code.len(), 2);
    }

    #[test]
    fn test_dump_labels_jump_targets() {
        use Instruction::*;
        let mut code = Code::new();
        code.add(FrameTemplate::new(
            "main",
            0,
            vec![
                Push(Constant::Bool(true)),
                Jmpf(4),
                Push("yes".into()),
                Write,
                Push(Constant::Nil),
                VRet,
            ],
        ));
        code.add(FrameTemplate::new("id", 1, vec![Store(0), Load(0), VRet]));

        let expected = indoc! {r#"
            frame main (arity 0)
                   0       push true
                   1       jmpf 4 (to L0)
                   2       push "yes"
                   3       write
                   4  L0:  push nil
                   5       vret

            frame id (arity 1)
                   0       store 0
                   1       load 0
                   2       vret
        "#};
        assert_eq!(code.to_string(), expected);
    }

    #[test]
    fn test_labels_numbered_by_address() {
        use Instruction::*;
        let template = FrameTemplate::new("f", 0, vec![Jmp(3), Jmp(1), Nop, Nop]);
        assert_eq!(template.jump_targets(), vec![1, 3]);
    }
}
