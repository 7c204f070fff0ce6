use std::path::Path;
use std::str::{FromStr, SplitWhitespace};

use glam::Vec3;
use tracing::debug;

use crate::error::{Result, ViewerError};

/// Contents of an OFF / NOFF file, validated but not yet attached to a mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OffMesh {
    pub vertices: Vec<Vec3>,
    /// Present only for NOFF input; one entry per vertex.
    pub normals: Option<Vec<Vec3>>,
    pub triangles: Vec<[u32; 3]>,
    /// Read from the header, otherwise unused.
    pub edge_count: i64,
}

/// Read and parse an OFF file from disk.
pub fn read_off(path: &Path) -> Result<OffMesh> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        ViewerError::Input(format!("Failed to read {}: {e}", path.display()))
    })?;
    let mesh = parse_off(&text)?;
    debug!(
        path = %path.display(),
        vertices = mesh.vertices.len(),
        triangles = mesh.triangles.len(),
        has_normals = mesh.normals.is_some(),
        "Parsed OFF file"
    );
    Ok(mesh)
}

/// Parse ASCII OFF (positions) or NOFF (positions + normals) text.
///
/// Faces must be triangles and reference existing vertices; anything else
/// rejects the whole file. `#` starts a comment running to end of line.
pub fn parse_off(text: &str) -> Result<OffMesh> {
    let stripped: String = text
        .lines()
        .map(|line| line.split('#').next().unwrap_or_default())
        .collect::<Vec<_>>()
        .join("\n");
    let mut tokens = Tokens::new(&stripped);

    let magic = tokens.next_token("magic")?;
    let with_normals = if magic.starts_with("NOFF") {
        true
    } else if magic.starts_with("OFF") {
        false
    } else {
        return Err(ViewerError::Parse(format!("Unknown magic token '{magic}'")));
    };

    let vertex_count: i64 = tokens.next_value("vertex count")?;
    let face_count: i64 = tokens.next_value("face count")?;
    let edge_count: i64 = tokens.next_value("edge count")?;
    if vertex_count <= 0 || face_count <= 0 {
        return Err(ViewerError::Parse(format!(
            "Invalid counts: {vertex_count} vertices, {face_count} faces"
        )));
    }
    let vertex_count = vertex_count as usize;
    let face_count = face_count as usize;

    // Header counts are untrusted; reserve no more than the input can hold.
    let remaining = tokens.remaining();
    let per_vertex = if with_normals { 6 } else { 3 };
    let mut vertices = Vec::with_capacity(vertex_count.min(remaining / per_vertex));
    let mut normals = with_normals.then(|| Vec::with_capacity(vertex_count.min(remaining / per_vertex)));
    for _ in 0..vertex_count {
        vertices.push(tokens.next_vec3("vertex")?);
        if let Some(normals) = normals.as_mut() {
            normals.push(tokens.next_vec3("normal")?);
        }
    }

    let mut triangles = Vec::with_capacity(face_count.min(tokens.remaining() / 4));
    for face in 0..face_count {
        let arity: i64 = tokens.next_value("face arity")?;
        if arity != 3 {
            return Err(ViewerError::Parse(format!(
                "Face {face} has {arity} vertices; only triangles are supported"
            )));
        }
        let mut tri = [0u32; 3];
        for slot in &mut tri {
            let index: u32 = tokens.next_value("face index")?;
            if index as usize >= vertex_count {
                return Err(ViewerError::Parse(format!(
                    "Face {face} references vertex {index} of {vertex_count}"
                )));
            }
            *slot = index;
        }
        triangles.push(tri);
    }

    Ok(OffMesh {
        vertices,
        normals,
        triangles,
        edge_count,
    })
}

struct Tokens<'a> {
    inner: SplitWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            inner: text.split_whitespace(),
        }
    }

    /// Tokens left to read.
    fn remaining(&self) -> usize {
        self.inner.clone().count()
    }

    fn next_token(&mut self, what: &str) -> Result<&'a str> {
        self.inner
            .next()
            .ok_or_else(|| ViewerError::Parse(format!("Unexpected end of file reading {what}")))
    }

    fn next_value<T: FromStr>(&mut self, what: &str) -> Result<T> {
        let token = self.next_token(what)?;
        token
            .parse()
            .map_err(|_| ViewerError::Parse(format!("Invalid {what}: '{token}'")))
    }

    fn next_vec3(&mut self, what: &str) -> Result<Vec3> {
        Ok(Vec3::new(
            self.next_value(what)?,
            self.next_value(what)?,
            self.next_value(what)?,
        ))
    }
}
