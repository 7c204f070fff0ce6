use std::path::Path;

use tracing::{debug, error, warn};

use crate::error::{Result, ViewerError};
use crate::gpu::{GraphicsContext, ProgramHandle};

/// Read both shader sources and compile them into a program.
pub fn load_program(ctx: &mut dyn GraphicsContext, vertex_path: &Path, fragment_path: &Path) -> Result<ProgramHandle> {
    let read = |path: &Path| {
        std::fs::read_to_string(path).map_err(|e| {
            ViewerError::Shader(format!("Failed to read {}: {e}", path.display()))
        })
    };
    let vertex_source = read(vertex_path)?;
    let fragment_source = read(fragment_path)?;

    let program = ctx.compile_program(&vertex_source, &fragment_source);
    if !program.is_allocated() {
        return Err(ViewerError::Shader(format!(
            "Failed to compile {} + {}",
            vertex_path.display(),
            fragment_path.display()
        )));
    }
    debug!(
        program = program.0,
        vertex = %vertex_path.display(),
        fragment = %fragment_path.display(),
        "Compiled shader program"
    );
    Ok(program)
}

/// Like [`load_program`], but logs failures and returns `NONE`.
pub fn read_shaders(ctx: &mut dyn GraphicsContext, vertex_path: &Path, fragment_path: &Path) -> ProgramHandle {
    load_program(ctx, vertex_path, fragment_path).unwrap_or_else(|e| {
        warn!("{e}");
        ProgramHandle::NONE
    })
}

/// Compiled programs selectable by index.
#[derive(Debug, Default)]
pub struct ProgramRegistry {
    programs: Vec<ProgramHandle>,
}

impl ProgramRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a compiled program and return its index; `NONE` is not registered.
    pub fn add(&mut self, program: ProgramHandle) -> Option<usize> {
        if !program.is_allocated() {
            return None;
        }
        self.programs.push(program);
        Some(self.programs.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ProgramHandle> + '_ {
        self.programs.iter().copied()
    }

    /// Program registered at `index`.
    ///
    /// # Panics
    ///
    /// When `index` was never registered. Selecting an unknown program is a
    /// caller bug, not a runtime condition.
    pub fn select(&self, index: usize) -> ProgramHandle {
        match self.programs.get(index) {
            Some(&program) => program,
            None => {
                error!(index, loaded = self.programs.len(), "Shader index out of range");
                panic!(
                    "tried to select shader program {index}, but only {} are loaded",
                    self.programs.len()
                );
            }
        }
    }

    /// Delete every registered program.
    pub fn release(&mut self, ctx: &mut dyn GraphicsContext) {
        for program in self.programs.drain(..) {
            ctx.delete_program(program);
        }
    }
}
