use std::path::Path;

/// Source text of the multiplication kernels shipped with the crate.
///
/// Contains the `MultiplyMatrices` and `MultiplyMatricesStandard` entry points; the
/// workgroup size is left as the `€tile` token.
pub const MULTIPLY_KERNEL: &str = include_str!("../kernels/multiply.wgsl");

/// Source text of the `vector_add` kernel shipped with the crate.
///
/// The element type is the `€elem` token and the workgroup size the `€tile` token.
pub const VECTOR_ADD_KERNEL: &str = include_str!("../kernels/vector_add.wgsl");

/// Token replaced with the workgroup (tile) size before compilation
pub const TILE_TOKEN: &str = "€tile";
/// Token replaced with the WGSL element type before compilation
pub const ELEMENT_TOKEN: &str = "€elem";

/// The [`Shader`] is a struct containing WGSL kernel code
///
/// This struct is not able to compile WGSL code, it's only purpose is to
/// hold the content of it, eventually manipulate it, and feeding it to a [`crate::program::Program`].
///
/// All the code checking is done when the program is built on a device (by `Naga`, called by `wgpu`),
/// never through this stage. This allows to keep tokens such as `€tile` in the text and resolve them
/// at run time, since pipeline overridable constants are not available in the `wgpu` version in use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shader {
    content: String,
}

/// A `@compute` function found in a [`Shader`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    pub name: String,
    /// The declared `@workgroup_size`, padded with 1s. `None` when it could not be read,
    /// e.g. because it still holds an unresolved token.
    pub workgroup_size: Option<[u32; 3]>,
}

impl Shader {
    /// This method creates a shader from a string literal.
    ///
    /// No effort whatsoever is done at this stage to check the correctness of the shader.
    ///
    /// # Example
    /// ```
    /// use wgpu_offload::coding::Shader;
    /// let shader = Shader::from_content("
    ///     @group(0) @binding(0)
    ///     var<storage, read_write> a: array<f32>;
    ///
    ///     @compute @workgroup_size(64)
    ///     fn double(@builtin(global_invocation_id) id: vec3<u32>) {
    ///         a[id.x] = a[id.x] * 2.0;
    ///     }
    /// ");
    /// assert_eq!(shader.entry_points()[0].name, "double");
    /// ```
    pub fn from_content(content: &str) -> Self {
        Shader {
            content: content.to_string(),
        }
    }

    /// This functions reads a --wgsl-- file to the shader content.
    ///
    /// Returns the [`std::io::Error`] if the file is not existent or not readable.
    pub fn from_file_path<P: AsRef<Path>>(path_to_module: P) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path_to_module.as_ref())?;
        Ok(Shader { content })
    }

    /// This function replaces the `from` string with the `to` string inside the [`Shader`]
    ///
    /// It replaces all the instances of the `from` string, so use this with caution, since no check
    /// on correctness of the final code is done in this function.
    ///
    /// # Examples
    /// ```
    /// use wgpu_offload::coding::Shader;
    /// let mut shader = Shader::from_content("@compute @workgroup_size(€tile, €tile) fn run() {}");
    /// shader.replace("€tile", "8");
    /// assert_eq!(shader.get_content(), "@compute @workgroup_size(8, 8) fn run() {}");
    /// assert_eq!(shader.entry_points()[0].workgroup_size, Some([8, 8, 1]));
    /// ```
    pub fn replace(&mut self, from: &str, to: &str) {
        self.content = self.content.replace(from, to);
    }

    /// This methods gets the content of the [`Shader`] as a string reference
    pub fn get_content(&self) -> &str {
        &self.content
    }

    /// Lists the `@compute` functions of the shader in source order.
    ///
    /// This is a lexical scan, not a parse: comments are skipped and the attributes written
    /// between the previous item and each `fn` are inspected.
    pub fn entry_points(&self) -> Vec<EntryPoint> {
        let code = strip_comments(&self.content);
        let bytes = code.as_bytes();
        let mut entries = Vec::new();

        for (pos, _) in code.match_indices("fn") {
            let starts_token = pos == 0 || !is_ident_byte(bytes[pos - 1]);
            let followed_by_space = bytes
                .get(pos + 2)
                .map_or(false, |next| next.is_ascii_whitespace());
            if !starts_token || !followed_by_space {
                continue;
            }

            let name: String = code[pos + 2..]
                .trim_start()
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
                .collect();
            if name.is_empty() {
                continue;
            }

            let item_start = code[..pos].rfind(|c: char| c == '}' || c == ';').map_or(0, |i| i + 1);
            let attributes = &code[item_start..pos];
            if !has_attribute(attributes, "@compute") {
                continue;
            }

            entries.push(EntryPoint {
                name,
                workgroup_size: workgroup_size(attributes),
            });
        }
        entries
    }

    /// Finds a `@compute` function by name
    pub fn entry_point(&self, name: &str) -> Option<EntryPoint> {
        self.entry_points().into_iter().find(|entry| entry.name == name)
    }
}

fn is_ident_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

fn has_attribute(attributes: &str, attribute: &str) -> bool {
    attributes.match_indices(attribute).any(|(pos, _)| {
        attributes
            .as_bytes()
            .get(pos + attribute.len())
            .map_or(true, |next| !is_ident_byte(*next))
    })
}

fn workgroup_size(attributes: &str) -> Option<[u32; 3]> {
    let start = attributes.find("@workgroup_size")?;
    let rest = &attributes[start + "@workgroup_size".len()..];
    let open = rest.find('(')?;
    let close = rest.find(')')?;
    if close < open {
        return None;
    }

    let mut size = [1u32; 3];
    let mut count = 0;
    for (slot, literal) in rest[open + 1..close].split(',').enumerate() {
        let literal = literal.trim();
        if literal.is_empty() {
            // trailing comma
            continue;
        }
        if slot >= 3 {
            return None;
        }
        let digits = literal.trim_end_matches(|c: char| c == 'u' || c == 'i');
        size[slot] = digits.parse().ok()?;
        count += 1;
    }
    if count == 0 {
        return None;
    }
    Some(size)
}

/// Removes `//` and (nested) `/* */` comments, keeping line breaks.
fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut depth = 0usize;

    while let Some(c) = chars.next() {
        if depth > 0 {
            match (c, chars.peek()) {
                ('*', Some('/')) => {
                    chars.next();
                    depth -= 1;
                    if depth == 0 {
                        out.push(' ');
                    }
                }
                ('/', Some('*')) => {
                    chars.next();
                    depth += 1;
                }
                ('\n', _) => out.push('\n'),
                _ => {}
            }
            continue;
        }
        match (c, chars.peek()) {
            ('/', Some('/')) => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                depth = 1;
            }
            _ => out.push(c),
        }
    }
    out
}
