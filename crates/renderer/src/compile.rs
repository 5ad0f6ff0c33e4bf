use std::borrow::Cow;
use std::path::Path;

use anyhow::{anyhow, Result};
use wgpu::naga::ShaderStage;

/// Output of [`wrap_fragment_shader`]: Vulkan-flavoured GLSL plus anything we had to paper over.
#[derive(Debug, Clone)]
pub(crate) struct WrappedShader {
    pub source: String,
    pub warnings: Vec<String>,
}

/// Compiles the plane vertex stage shared by every shader.
pub(crate) fn compile_vertex_shader(device: &wgpu::Device) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("plane vertex"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(VERTEX_SHADER_GLSL),
            stage: ShaderStage::Vertex,
            defines: &[],
        },
    })
}

/// Wraps a desktop-GLSL fragment shader and compiles it with naga's GLSL frontend.
///
/// Validation errors are captured through an error scope so a broken shader
/// becomes an `Err` instead of a device panic. On failure the wrapped source
/// is dumped next to the system temp dir to make line numbers easy to follow.
pub(crate) fn compile_fragment_shader(
    device: &wgpu::Device,
    path: &Path,
    source: &str,
) -> Result<wgpu::ShaderModule> {
    let wrapped = wrap_fragment_shader(source);
    for warning in &wrapped.warnings {
        tracing::warn!(shader = %path.display(), "{warning}");
    }

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&format!("fragment {}", path.display())),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(wrapped.source.clone()),
            stage: ShaderStage::Fragment,
            defines: &[],
        },
    });
    if let Some(error) = pollster::block_on(device.pop_error_scope()) {
        let dump = std::env::temp_dir().join("odyssey_wrapped.frag");
        if let Err(err) = std::fs::write(&dump, &wrapped.source) {
            tracing::debug!(error = %err, "failed to dump wrapped shader");
        } else {
            tracing::info!(dump = %dump.display(), "wrapped shader written for inspection");
        }
        return Err(anyhow!(
            "failed to compile shader {}: {error}",
            path.display()
        ));
    }
    Ok(module)
}

/// Produces a self-contained Vulkan GLSL fragment shader from desktop GLSL.
///
/// Steps performed:
///
/// 1. Strip `#version`, `#extension` and `precision` lines.
/// 2. Drop declarations of the engine-provided uniforms (`u_time`,
///    `u_resolution`, `tex0`); [`HEADER`] supplies them through a std140
///    block and a texture/sampler pair.
/// 3. Alias user `out vec4` outputs and `gl_FragColor` to our colour target,
///    and `in`/`varying vec2` inputs to the plane texture coordinate.
/// 4. Rename the user's `main` and append [`FOOTER`], which remaps
///    `gl_FragCoord` to a bottom-left origin before calling it.
pub(crate) fn wrap_fragment_shader(source: &str) -> WrappedShader {
    let mut body = String::with_capacity(source.len());
    let mut aliases = Vec::new();
    let mut warnings = Vec::new();
    let mut skipped_version = false;

    for (index, line) in source.lines().enumerate() {
        let trimmed = line.trim_start();
        let line_number = index + 1;

        if !skipped_version && trimmed.starts_with("#version") {
            skipped_version = true;
            body.push('\n');
            continue;
        }
        if trimmed.starts_with("#extension") {
            warnings.push(format!("line {line_number}: ignoring `{}`", trimmed.trim_end()));
            body.push('\n');
            continue;
        }
        if trimmed.starts_with("precision ") {
            body.push('\n');
            continue;
        }

        match classify_declaration(trimmed) {
            Some(Declaration::Uniform { ty, name }) => {
                if !ENGINE_UNIFORMS.contains(&name) {
                    if ty.starts_with("sampler") {
                        warnings.push(format!(
                            "line {line_number}: sampler `{name}` is not bound by the engine"
                        ));
                    } else {
                        warnings.push(format!(
                            "line {line_number}: uniform `{name}` is not provided; it will read as zero"
                        ));
                        body.push_str(&format!("{ty} {name} = {ty}(0);"));
                    }
                }
                body.push('\n');
                continue;
            }
            Some(Declaration::Output { name }) => {
                aliases.push(format!("#define {name} odyssey_out_color"));
                body.push('\n');
                continue;
            }
            Some(Declaration::Input { ty, name }) => {
                if ty == "vec2" {
                    aliases.push(format!("#define {name} odyssey_texcoord"));
                } else {
                    warnings.push(format!(
                        "line {line_number}: input `{name}` ({ty}) has no matching vertex output; it will read as zero"
                    ));
                    body.push_str(&format!("{ty} {name} = {ty}(0);"));
                }
                body.push('\n');
                continue;
            }
            None => {}
        }

        body.push_str(line);
        body.push('\n');
    }

    let aliases = aliases.join("\n");
    WrappedShader {
        source: format!("{HEADER}{aliases}\n#define main odyssey_user_main\n#line 1\n{body}{FOOTER}"),
        warnings,
    }
}

const ENGINE_UNIFORMS: [&str; 3] = ["u_time", "u_resolution", "tex0"];

#[derive(Debug, PartialEq, Eq)]
enum Declaration<'a> {
    Uniform { ty: &'a str, name: &'a str },
    Output { name: &'a str },
    Input { ty: &'a str, name: &'a str },
}

/// Recognises single top-level `uniform`/`in`/`out`/`varying` declarations.
fn classify_declaration(line: &str) -> Option<Declaration<'_>> {
    let code = line.split("//").next().unwrap_or_default().trim();
    let code = code.strip_suffix(';')?.trim();
    let code = strip_layout_qualifier(code);

    let mut tokens = code.split_whitespace();
    let storage = tokens.next()?;
    let rest: Vec<&str> = tokens
        .filter(|token| !matches!(*token, "highp" | "mediump" | "lowp" | "flat" | "smooth"))
        .collect();
    let [ty, name] = rest[..] else {
        return None;
    };
    if !is_identifier(name) {
        return None;
    }

    match storage {
        "uniform" => Some(Declaration::Uniform { ty, name }),
        "out" if ty == "vec4" => Some(Declaration::Output { name }),
        "in" | "varying" => Some(Declaration::Input { ty, name }),
        _ => None,
    }
}

fn strip_layout_qualifier(code: &str) -> &str {
    if let Some(rest) = code.strip_prefix("layout") {
        if let Some(close) = rest.find(')') {
            return rest[close + 1..].trim_start();
        }
    }
    code
}

fn is_identifier(token: &str) -> bool {
    let mut chars = token.chars();
    matches!(chars.next(), Some(first) if first.is_ascii_alphabetic() || first == '_')
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

/// GLSL prologue injected ahead of every fragment shader.
///
/// The uniform block layout must match `PlaneUniforms` in `gpu/uniforms.rs`.
const HEADER: &str = r"#version 450
layout(location = 0) in vec2 odyssey_texcoord;
layout(location = 0) out vec4 odyssey_out_color;

layout(std140, set = 0, binding = 0) uniform PlaneParams {
    mat4 _transform;
    vec2 _u_resolution;
    float _u_time;
    float _padding0;
    vec4 _surface;
} ubo;

#define u_time ubo._u_time
#define u_resolution ubo._u_resolution

layout(set = 1, binding = 0) uniform texture2D odyssey_tex0_texture;
layout(set = 1, binding = 1) uniform sampler odyssey_tex0_sampler;

#define tex0 sampler2D(odyssey_tex0_texture, odyssey_tex0_sampler)
#define texture2D texture

vec4 odyssey_gl_FragCoord;
#define gl_FragCoord odyssey_gl_FragCoord
#define gl_FragColor odyssey_out_color
";

/// GLSL epilogue that remaps window coordinates and calls the user's `main`.
const FOOTER: &str = r"#undef main
void main() {
    // Read the hardware builtin, then flip to OpenGL's bottom-left origin.
    #undef gl_FragCoord
    vec4 odyssey_builtin = gl_FragCoord;
    #define gl_FragCoord odyssey_gl_FragCoord

    odyssey_gl_FragCoord = vec4(
        odyssey_builtin.x,
        ubo._surface.y - odyssey_builtin.y,
        odyssey_builtin.z,
        odyssey_builtin.w
    );
    odyssey_out_color = vec4(0.0);
    odyssey_user_main();
}
";

/// Plane vertex shader: pixel-space positions through the combined transform.
const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) in vec3 position;
layout(location = 1) in vec2 texcoord;
layout(location = 0) out vec2 odyssey_texcoord;

layout(std140, set = 0, binding = 0) uniform PlaneParams {
    mat4 _transform;
    vec2 _u_resolution;
    float _u_time;
    float _padding0;
    vec4 _surface;
} ubo;

void main() {
    odyssey_texcoord = texcoord;
    gl_Position = ubo._transform * vec4(position, 1.0);
}
";
