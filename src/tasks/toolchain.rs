// src/tasks/toolchain.rs

//! Command templates and artifact naming.
//!
//! Everything platform specific about invoking the compiler and linker lives
//! here as data, so the scheduler and orchestrator never format command lines
//! themselves.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::model::ToolchainSection;
use crate::tasks::roles::LinkStyle;
use crate::types::Platform;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub platform: Platform,
    pub compile: String,
    pub include_flag: String,
    pub static_link: String,
    pub shared_link: String,
    pub exe_link: String,
    /// Derived object suffix, including the leading dot.
    pub object_suffix: String,
    pub static_lib: String,
    pub shared_lib: String,
    pub executable: String,
    pub libs: BTreeMap<String, Vec<String>>,
}

impl Toolchain {
    /// Built-in defaults for a platform.
    pub fn for_platform(platform: Platform) -> Self {
        if platform.is_windows() {
            Self {
                platform,
                compile: "cl /nologo /c /EHsc {includes} {source} /Fo{object}".to_string(),
                include_flag: "/I{dir}".to_string(),
                static_link: "lib /nologo /OUT:{target} {objects}".to_string(),
                shared_link: "link /nologo /DLL /OUT:{target} {objects} {libs}".to_string(),
                exe_link: "link /nologo /OUT:{target} {objects} {libs}".to_string(),
                object_suffix: ".obj".to_string(),
                static_lib: "{name}.lib".to_string(),
                shared_lib: "{name}.dll".to_string(),
                executable: "{name}.exe".to_string(),
                libs: BTreeMap::new(),
            }
        } else {
            let shared_lib = if matches!(platform, Platform::Macos) {
                "lib{name}.dylib"
            } else {
                "lib{name}.so"
            };
            Self {
                platform,
                compile: "c++ -c -std=c++17 -fPIC {includes} {source} -o {object}".to_string(),
                include_flag: "-I{dir}".to_string(),
                static_link: "ar rcs {target} {objects}".to_string(),
                shared_link: "c++ -shared -o {target} {objects} {libs}".to_string(),
                exe_link: "c++ -o {target} {objects} {libs}".to_string(),
                object_suffix: ".o".to_string(),
                static_lib: "lib{name}.a".to_string(),
                shared_lib: shared_lib.to_string(),
                executable: "{name}".to_string(),
                libs: BTreeMap::new(),
            }
        }
    }

    /// Platform defaults overridden by whatever `[toolchain]` sets.
    pub fn from_section(section: &ToolchainSection, platform: Platform) -> Self {
        let mut tc = Self::for_platform(platform);
        let overrides = [
            (&mut tc.compile, &section.compile),
            (&mut tc.include_flag, &section.include_flag),
            (&mut tc.static_link, &section.static_link),
            (&mut tc.shared_link, &section.shared_link),
            (&mut tc.exe_link, &section.exe_link),
            (&mut tc.static_lib, &section.static_lib),
            (&mut tc.shared_lib, &section.shared_lib),
            (&mut tc.executable, &section.executable),
        ];
        for (slot, value) in overrides {
            if let Some(v) = value {
                *slot = v.clone();
            }
        }
        if let Some(suffix) = &section.object_suffix {
            tc.object_suffix = if suffix.starts_with('.') {
                suffix.clone()
            } else {
                format!(".{suffix}")
            };
        }
        tc.libs = section.libs.clone();
        tc
    }

    /// Derived object file for a source file: same directory, extension
    /// replaced by the object suffix.
    pub fn object_path(&self, source: &Path) -> PathBuf {
        source.with_extension(self.object_suffix.trim_start_matches('.'))
    }

    /// File name of a link artifact called `name`.
    pub fn artifact_name(&self, style: LinkStyle, name: &str) -> Option<String> {
        let template = match style {
            LinkStyle::None => return None,
            LinkStyle::Static => &self.static_lib,
            LinkStyle::Shared => &self.shared_lib,
            LinkStyle::Executable => &self.executable,
        };
        Some(render(template, &[("name", name)]))
    }

    pub fn compile_command(&self, source: &Path, object: &Path, include_dirs: &[PathBuf]) -> String {
        let includes = include_dirs
            .iter()
            .map(|dir| render(&self.include_flag, &[("dir", &quote(dir))]))
            .collect::<Vec<_>>()
            .join(" ");
        render(
            &self.compile,
            &[
                ("includes", &includes),
                ("source", &quote(source)),
                ("object", &quote(object)),
            ],
        )
    }

    /// Link command for `style`; empty for [`LinkStyle::None`].
    pub fn link_command(
        &self,
        style: LinkStyle,
        target: &Path,
        objects: &[PathBuf],
        libs: &[String],
    ) -> String {
        let template = match style {
            LinkStyle::None => return String::new(),
            LinkStyle::Static => &self.static_link,
            LinkStyle::Shared => &self.shared_link,
            LinkStyle::Executable => &self.exe_link,
        };
        let objects = objects.iter().map(|o| quote(o)).collect::<Vec<_>>().join(" ");
        let libs = libs.join(" ");
        render(
            template,
            &[("target", &quote(target)), ("objects", &objects), ("libs", &libs)],
        )
    }

    /// Third-party libraries configured for a role key.
    pub fn libs_for(&self, key: &str) -> &[String] {
        self.libs.get(key).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Substitute `{key}` placeholders; collapses the double spaces left by empty
/// values.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("{{{key}}}"), value);
    }
    out.split(' ')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn quote(path: &Path) -> String {
    let s = path.to_string_lossy();
    if s.contains(char::is_whitespace) {
        format!("\"{s}\"")
    } else {
        s.into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_suffix_follows_platform() {
        let unix = Toolchain::for_platform(Platform::Linux);
        let win = Toolchain::for_platform(Platform::Windows);
        assert_eq!(unix.object_path(Path::new("/p/glob/a.cpp")), PathBuf::from("/p/glob/a.o"));
        assert_eq!(win.object_path(Path::new("/p/glob/a.cpp")), PathBuf::from("/p/glob/a.obj"));
    }

    #[test]
    fn render_drops_empty_placeholders() {
        let tc = Toolchain::for_platform(Platform::Linux);
        let cmd = tc.link_command(
            LinkStyle::Shared,
            Path::new("/p/liba.so"),
            &[PathBuf::from("/p/a.o")],
            &[],
        );
        assert_eq!(cmd, "c++ -shared -o /p/liba.so /p/a.o");
    }

    #[test]
    fn section_overrides_defaults() {
        let section = ToolchainSection {
            compile: Some("clang++ -c {source} -o {object} {includes}".to_string()),
            object_suffix: Some("obj".to_string()),
            ..Default::default()
        };
        let tc = Toolchain::from_section(&section, Platform::Linux);
        let cmd = tc.compile_command(
            Path::new("/p/my dir/a.cpp"),
            Path::new("/p/a.obj"),
            &[PathBuf::from("/p/inc")],
        );
        assert_eq!(cmd, "clang++ -c \"/p/my dir/a.cpp\" -o /p/a.obj -I/p/inc");
        assert_eq!(tc.object_suffix, ".obj");
    }

    #[test]
    fn artifact_names() {
        let tc = Toolchain::for_platform(Platform::Linux);
        assert_eq!(tc.artifact_name(LinkStyle::Static, "glob").as_deref(), Some("libglob.a"));
        assert_eq!(tc.artifact_name(LinkStyle::Executable, "server").as_deref(), Some("server"));
        assert_eq!(tc.artifact_name(LinkStyle::None, "x"), None);
    }
}
