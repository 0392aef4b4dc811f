//! Built-in rule generations.
//!
//! Each function returns one frozen snapshot. Later generations are written
//! out in full rather than derived from earlier ones, so editing one
//! generation can never change another.

use std::collections::BTreeMap;

use crate::core::definitions::DefinitionValue;
use crate::core::dependency::DependencyRequirement;
use crate::core::options::{Exclusion, LogLevel, OptionName, OptionSchema, OptionSpec};
use crate::core::platform::{Arch, CompilerName, Os};

use super::{
    above, below, ArtifactRules, DefinitionRule, DependencyPin, EffectRule, LogLevelEncoding,
    OptionEffect, PatchRule, PlatformMatch, RuleTable, SystemLibsRule, ThreadFlagRule,
    ToolchainRule,
};

const LOG_LEVELS: [LogLevel; 6] = [
    LogLevel::Error,
    LogLevel::Warning,
    LogLevel::Info,
    LogLevel::Debug,
    LogLevel::Trace,
    LogLevel::None,
];

/// Coarse compiler gating, no PIC toggle, numeric log levels.
pub(super) fn gen1() -> RuleTable {
    let schema = OptionSchema::new(vec![
        OptionSpec::boolean(OptionName::Shared, false)
            .excluded_on(Exclusion::os(Os::Windows))
            .excluded_on(Exclusion::arch(Arch::X86)),
        OptionSpec::levels(OptionName::LogLevel, LOG_LEVELS.to_vec(), LogLevel::None),
        OptionSpec::boolean(OptionName::Openssl, true)
            .excluded_on(Exclusion::os(Os::Windows))
            .excluded_on(Exclusion::arch(Arch::X86)),
    ]);

    RuleTable {
        generation: "gen1".to_string(),
        schema,
        toolchain: vec![
            ToolchainRule::minimum(
                CompilerName::Gcc,
                4,
                8,
                "g++ >= 4.8 is required, yours is {version}",
            ),
            ToolchainRule::minimum(
                CompilerName::Clang,
                3,
                4,
                "clang >= 3.4 is required, yours is {version}",
            ),
            ToolchainRule::minimum(
                CompilerName::VisualStudio,
                14,
                0,
                "Visual Studio >= 14 is required, yours is {version}",
            ),
        ],
        dependency: DependencyPin {
            option: OptionName::Openssl,
            requirement: DependencyRequirement::new("OpenSSL", "1.0.2o")
                .with_user_channel("conan/stable"),
        },
        log_level_encoding: LogLevelEncoding::Index,
        effects: vec![
            effect(OptionName::Shared, OptionEffect::Linkage),
            effect(OptionName::LogLevel, OptionEffect::LogLevel),
            effect(OptionName::Openssl, OptionEffect::CryptoBackend),
        ],
        fixed_definitions: fixed_definitions(),
        thread_flags: Vec::new(),
        linker: Vec::new(),
        arch_overrides: vec![macos_i386()],
        patches: Vec::new(),
        artifacts: artifacts(),
        system_libs: system_libs(),
    }
}

/// Adds the PIC toggle, refined minimums, an armv8 exception and thread
/// flags.
pub(super) fn gen2() -> RuleTable {
    let schema = OptionSchema::new(vec![
        OptionSpec::boolean(OptionName::Shared, false)
            .excluded_on(Exclusion::os(Os::Windows))
            .excluded_on(Exclusion::arch(Arch::X86)),
        OptionSpec::boolean(OptionName::Fpic, true).excluded_on(Exclusion::os(Os::Windows)),
        OptionSpec::levels(OptionName::LogLevel, LOG_LEVELS.to_vec(), LogLevel::None),
        OptionSpec::boolean(OptionName::Openssl, true)
            .excluded_on(Exclusion::os(Os::Windows))
            .excluded_on(Exclusion::arch(Arch::X86)),
    ]);

    RuleTable {
        generation: "gen2".to_string(),
        schema,
        toolchain: vec![
            ToolchainRule::exception(
                CompilerName::Clang,
                below(5, 0),
                Arch::Armv8,
                "clang >= 5.0 is required on armv8, yours is {version}",
            ),
            ToolchainRule::minimum(
                CompilerName::Gcc,
                4,
                8,
                "g++ >= 4.8 is required, yours is {version}",
            ),
            ToolchainRule::minimum(
                CompilerName::Clang,
                4,
                0,
                "clang >= 4.0 is required, yours is {version}",
            ),
            ToolchainRule::minimum(
                CompilerName::VisualStudio,
                15,
                0,
                "Visual Studio >= 15 is required, yours is {version}",
            ),
        ],
        dependency: DependencyPin {
            option: OptionName::Openssl,
            requirement: DependencyRequirement::new("openssl", "1.1.1d"),
        },
        log_level_encoding: LogLevelEncoding::Index,
        effects: vec![
            effect(OptionName::Shared, OptionEffect::Linkage),
            effect(OptionName::Fpic, OptionEffect::PositionIndependentCode),
            effect(OptionName::LogLevel, OptionEffect::LogLevel),
            effect(OptionName::Openssl, OptionEffect::CryptoBackend),
        ],
        fixed_definitions: fixed_definitions(),
        thread_flags: thread_flags(),
        linker: Vec::new(),
        arch_overrides: vec![macos_i386()],
        patches: Vec::new(),
        artifacts: artifacts(),
        system_libs: system_libs(),
    }
}

/// Adds apple-clang, the x86 upper-bound exception, symbolic log levels,
/// Linux linker settings and the Windows patch.
pub(super) fn gen3() -> RuleTable {
    let schema = OptionSchema::new(vec![
        OptionSpec::boolean(OptionName::Shared, false)
            .excluded_on(Exclusion::os_and_arch(Os::Windows, Arch::X86)),
        OptionSpec::boolean(OptionName::Fpic, true).excluded_on(Exclusion::os(Os::Windows)),
        OptionSpec::levels(OptionName::LogLevel, LOG_LEVELS.to_vec(), LogLevel::None),
        OptionSpec::boolean(OptionName::Openssl, true)
            .excluded_on(Exclusion::os_and_arch(Os::Windows, Arch::X86)),
    ]);

    let mut linker_flags = BTreeMap::new();
    linker_flags.insert(
        "CMAKE_SHARED_LINKER_FLAGS".to_string(),
        DefinitionValue::from("-pthread"),
    );
    linker_flags.insert(
        "CMAKE_EXE_LINKER_FLAGS".to_string(),
        DefinitionValue::from("-pthread"),
    );

    RuleTable {
        generation: "gen3".to_string(),
        schema,
        toolchain: vec![
            ToolchainRule::exception(
                CompilerName::AppleClang,
                above(10, 0),
                Arch::X86,
                "apple-clang > 10.0 does not support x86, yours is {version}",
            ),
            ToolchainRule::exception(
                CompilerName::Clang,
                below(5, 0),
                Arch::Armv8,
                "clang >= 5.0 is required on armv8, yours is {version}",
            ),
            ToolchainRule::minimum(
                CompilerName::Gcc,
                4,
                8,
                "g++ >= 4.8 is required, yours is {version}",
            ),
            ToolchainRule::minimum(
                CompilerName::Clang,
                4,
                0,
                "clang >= 4.0 is required, yours is {version}",
            ),
            ToolchainRule::minimum(
                CompilerName::AppleClang,
                9,
                0,
                "apple-clang >= 9.0 is required, yours is {version}",
            ),
            ToolchainRule::minimum(
                CompilerName::VisualStudio,
                15,
                0,
                "Visual Studio >= 15 is required, yours is {version}",
            ),
        ],
        dependency: DependencyPin {
            option: OptionName::Openssl,
            requirement: DependencyRequirement::new("openssl", "1.1.1g"),
        },
        log_level_encoding: LogLevelEncoding::Symbolic {
            disabled: LogLevel::None,
        },
        effects: vec![
            effect(OptionName::Shared, OptionEffect::Linkage),
            effect(OptionName::Fpic, OptionEffect::PositionIndependentCode),
            effect(OptionName::LogLevel, OptionEffect::LogLevel),
            effect(OptionName::Openssl, OptionEffect::CryptoBackend),
        ],
        fixed_definitions: fixed_definitions(),
        thread_flags: thread_flags(),
        linker: vec![DefinitionRule {
            platform: PlatformMatch::os(Os::Linux),
            definitions: linker_flags,
        }],
        arch_overrides: vec![macos_i386()],
        patches: vec![PatchRule {
            platform: PlatformMatch::os(Os::Windows),
            patch: "0001-msvc-export-symbols.patch".to_string(),
        }],
        artifacts: artifacts(),
        system_libs: system_libs(),
    }
}

fn effect(option: OptionName, effect: OptionEffect) -> EffectRule {
    EffectRule { option, effect }
}

fn fixed_definitions() -> BTreeMap<String, DefinitionValue> {
    let mut defs = BTreeMap::new();
    defs.insert("CMAKE_CXX_STANDARD".to_string(), DefinitionValue::from("11"));
    for key in [
        "CAF_NO_EXAMPLES",
        "CAF_NO_TOOLS",
        "CAF_NO_UNIT_TESTS",
        "CAF_NO_PYTHON",
    ] {
        defs.insert(key.to_string(), DefinitionValue::Bool(true));
    }
    defs
}

fn thread_flags() -> Vec<ThreadFlagRule> {
    vec![
        ThreadFlagRule {
            platform: PlatformMatch::os(Os::Linux)
                .compiler(CompilerName::Gcc)
                .versions(below(5, 0)),
            flag: "-Wl,--no-as-needed -lpthread".to_string(),
        },
        ThreadFlagRule {
            platform: PlatformMatch::os(Os::Linux).compiler(CompilerName::Gcc),
            flag: "-pthread".to_string(),
        },
        ThreadFlagRule {
            platform: PlatformMatch::os(Os::Linux),
            flag: "-lpthread".to_string(),
        },
    ]
}

fn macos_i386() -> DefinitionRule {
    let mut definitions = BTreeMap::new();
    definitions.insert(
        "CMAKE_OSX_ARCHITECTURES".to_string(),
        DefinitionValue::from("i386"),
    );
    DefinitionRule {
        platform: PlatformMatch::os(Os::Macos).arch(Arch::X86),
        definitions,
    }
}

fn artifacts() -> ArtifactRules {
    ArtifactRules {
        core: vec!["caf_core".to_string(), "caf_io".to_string()],
        optional: "caf_openssl".to_string(),
        static_suffix: "_static".to_string(),
    }
}

fn system_libs() -> Vec<SystemLibsRule> {
    vec![
        SystemLibsRule {
            platform: PlatformMatch::os(Os::Windows).compiler(CompilerName::VisualStudio),
            libs: vec!["ws2_32".to_string(), "iphlpapi".to_string()],
        },
        SystemLibsRule {
            platform: PlatformMatch::os(Os::Linux),
            libs: vec!["pthread".to_string()],
        },
    ]
}
