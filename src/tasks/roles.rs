// src/tasks/roles.rs

//! Folder roles and their build/link rules.
//!
//! Each top-level folder of the project plays a role (`glob`, `server`,
//! `client`, `logic/<name>`, a generated subfolder, or one of the two
//! executable pseudo-targets). What a role compiles against and how it links
//! is described by one row of [`ROLE_RULES`]; task construction only reads
//! the table.

/// Pseudo-target linking the server executable.
pub const SERVER_EXE: &str = "server-exe";
/// Pseudo-target linking the client executable.
pub const CLIENT_EXE: &str = "client-exe";

pub const GLOB: &str = "glob";
pub const SERVER: &str = "server";
pub const CLIENT: &str = "client";
pub const LOGIC: &str = "logic";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderRole {
    Glob,
    Server,
    Client,
    Logic(String),
    /// Generated-code subfolder, compiled as part of its owner folder.
    Generated { owner: String },
    ServerExe,
    ClientExe,
    /// Any other scanned folder: compiled against itself, never linked.
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleKind {
    Glob,
    Server,
    Client,
    Logic,
    ServerExe,
    ClientExe,
    Plain,
}

/// Where a role's include directories come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncludeSource {
    /// The folder itself.
    Own,
    /// The folder's generated-code subfolder.
    Generated,
    Glob,
    /// Every logic module the folder's module depends on (transitively),
    /// together with their generated subfolders.
    LogicDependencies,
    /// Every logic module and generated subfolder.
    AllLogic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStyle {
    None,
    Static,
    Shared,
    Executable,
}

/// Which object files go into the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectSource {
    None,
    /// The folder and its generated subfolder.
    Own,
    /// Own objects plus every logic module's (and their generated code).
    OwnAndLogic,
}

/// Link artifacts of other roles a link depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleLibrary {
    Glob,
    Server,
    Client,
    LogicDependencies,
}

#[derive(Debug, Clone, Copy)]
pub struct RoleRule {
    pub kind: RoleKind,
    pub includes: &'static [IncludeSource],
    pub link: LinkStyle,
    pub objects: ObjectSource,
    pub libraries: &'static [RoleLibrary],
    /// Relink whenever any input is newer than the target.
    pub aggregation: bool,
    /// Key into `[toolchain.libs]`.
    pub libs_key: &'static str,
}

pub static ROLE_RULES: &[RoleRule] = &[
    RoleRule {
        kind: RoleKind::Glob,
        includes: &[IncludeSource::Own, IncludeSource::Generated],
        link: LinkStyle::Static,
        objects: ObjectSource::Own,
        libraries: &[],
        aggregation: false,
        libs_key: GLOB,
    },
    RoleRule {
        kind: RoleKind::Server,
        includes: &[
            IncludeSource::Own,
            IncludeSource::Generated,
            IncludeSource::Glob,
            IncludeSource::AllLogic,
        ],
        link: LinkStyle::Static,
        objects: ObjectSource::OwnAndLogic,
        libraries: &[],
        aggregation: true,
        libs_key: SERVER,
    },
    RoleRule {
        kind: RoleKind::Client,
        includes: &[IncludeSource::Own, IncludeSource::Generated, IncludeSource::Glob],
        link: LinkStyle::Static,
        objects: ObjectSource::Own,
        libraries: &[],
        aggregation: false,
        libs_key: CLIENT,
    },
    RoleRule {
        kind: RoleKind::Logic,
        includes: &[
            IncludeSource::Own,
            IncludeSource::Generated,
            IncludeSource::Glob,
            IncludeSource::LogicDependencies,
        ],
        link: LinkStyle::Shared,
        objects: ObjectSource::Own,
        libraries: &[RoleLibrary::LogicDependencies, RoleLibrary::Glob],
        aggregation: false,
        libs_key: LOGIC,
    },
    RoleRule {
        kind: RoleKind::ServerExe,
        includes: &[],
        link: LinkStyle::Executable,
        objects: ObjectSource::None,
        libraries: &[RoleLibrary::Server, RoleLibrary::Glob],
        aggregation: true,
        libs_key: SERVER_EXE,
    },
    RoleRule {
        kind: RoleKind::ClientExe,
        includes: &[],
        link: LinkStyle::Executable,
        objects: ObjectSource::None,
        libraries: &[RoleLibrary::Client, RoleLibrary::Glob],
        aggregation: true,
        libs_key: CLIENT_EXE,
    },
    RoleRule {
        kind: RoleKind::Plain,
        includes: &[IncludeSource::Own],
        link: LinkStyle::None,
        objects: ObjectSource::None,
        libraries: &[],
        aggregation: false,
        libs_key: "",
    },
];

impl FolderRole {
    /// Classify a slash-separated folder path.
    ///
    /// `generated` is the name of generated-code subfolders (`sqldo`).
    pub fn classify(path: &str, generated: &str) -> FolderRole {
        let path = path.trim_matches('/');
        match path {
            SERVER_EXE => return FolderRole::ServerExe,
            CLIENT_EXE => return FolderRole::ClientExe,
            GLOB => return FolderRole::Glob,
            SERVER => return FolderRole::Server,
            CLIENT => return FolderRole::Client,
            _ => {}
        }

        if let Some((owner, last)) = path.rsplit_once('/') {
            if last == generated {
                let owner_role = FolderRole::classify(owner, generated);
                if !matches!(owner_role, FolderRole::Plain | FolderRole::Generated { .. }) {
                    return FolderRole::Generated {
                        owner: owner.to_string(),
                    };
                }
            }
        }

        let segments: Vec<&str> = path.split('/').collect();
        if let [LOGIC, name] = segments.as_slice() {
            return FolderRole::Logic(name.to_string());
        }

        FolderRole::Plain
    }

    pub fn is_executable(&self) -> bool {
        matches!(self, FolderRole::ServerExe | FolderRole::ClientExe)
    }

    /// Rule row for this role. Generated folders use their owner's row.
    pub fn rule(&self, generated: &str) -> &'static RoleRule {
        let kind = match self {
            FolderRole::Glob => RoleKind::Glob,
            FolderRole::Server => RoleKind::Server,
            FolderRole::Client => RoleKind::Client,
            FolderRole::Logic(_) => RoleKind::Logic,
            FolderRole::ServerExe => RoleKind::ServerExe,
            FolderRole::ClientExe => RoleKind::ClientExe,
            FolderRole::Plain => RoleKind::Plain,
            FolderRole::Generated { owner } => {
                return FolderRole::classify(owner, generated).rule(generated);
            }
        };
        rule_for(kind)
    }

    /// Name the role's link artifact is derived from.
    pub fn artifact_stem(&self) -> Option<&str> {
        match self {
            FolderRole::Glob => Some(GLOB),
            FolderRole::Server | FolderRole::ServerExe => Some(SERVER),
            FolderRole::Client | FolderRole::ClientExe => Some(CLIENT),
            FolderRole::Logic(name) => Some(name.as_str()),
            FolderRole::Generated { .. } | FolderRole::Plain => None,
        }
    }
}

pub fn rule_for(kind: RoleKind) -> &'static RoleRule {
    ROLE_RULES
        .iter()
        .find(|r| r.kind == kind)
        .unwrap_or(&ROLE_RULES[ROLE_RULES.len() - 1])
}
