//! Theme catalog.
//!
//! The catalog maps theme names to the GitHub repositories they are
//! installed from, and classifies themes as light or dark. It is built once
//! at startup and never mutated.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::config::CatalogConfig;
use crate::error::{Error, Result};
use crate::theme::{self, ThemeMode};

/// Official themes from the Omarchy manual's extra-themes page, sorted by name.
pub const OFFICIAL_THEMES: &[(&str, &str)] = &[
    ("all-hallows-eve", "https://github.com/guilhermetk/omarchy-all-hallows-eve-theme"),
    ("amberbyte", "https://github.com/tahfizhabib/omarchy-amberbyte-theme"),
    ("arc-blueberry", "https://github.com/vale-c/omarchy-arc-blueberry"),
    ("archwave", "https://github.com/davidguttman/archwave"),
    ("artzen", "https://github.com/tahfizhabib/omarchy-artzen-theme"),
    ("ash", "https://github.com/bjarneo/omarchy-ash-theme"),
    ("aura", "https://github.com/bjarneo/omarchy-aura-theme"),
    ("ayaka", "https://github.com/abhijeet-swami/omarchy-ayaka-theme"),
    ("azure-glow", "https://github.com/Hydradevx/omarchy-azure-glow-theme"),
    ("bauhaus", "https://github.com/somerocketeer/omarchy-bauhaus-theme"),
    ("black_arch", "https://github.com/ankur311sudo/black_arch"),
    ("blackgold", "https://github.com/HANCORE-linux/omarchy-blackgold-theme"),
    ("blackturq", "https://github.com/HANCORE-linux/omarchy-blackturq-theme"),
    ("bliss", "https://github.com/mishonki3/omarchy-bliss-theme"),
    ("bluedotrb", "https://github.com/dotsilva/omarchy-bluedotrb-theme"),
    ("blueridge-dark", "https://github.com/hipsterusername/omarchy-blueridge-dark-theme"),
    ("catppuccin-dark", "https://github.com/Luquatic/omarchy-catppuccin-dark"),
    ("citrus-cynapse", "https://github.com/Grey-007/citrus-cynapse"),
    ("cobalt2", "https://github.com/hoblin/omarchy-cobalt2-theme"),
    ("darcula", "https://github.com/noahljungberg/omarchy-darcula-theme"),
    ("demon", "https://github.com/HANCORE-linux/omarchy-demon-theme"),
    ("dotrb", "https://github.com/dotsilva/omarchy-dotrb-theme"),
    ("drac", "https://github.com/ShehabShaef/omarchy-drac-theme"),
    ("dracula", "https://github.com/catlee/omarchy-dracula-theme"),
    ("eldritch", "https://github.com/eldritch-theme/omarchy"),
    ("evergarden", "https://github.com/celsobenedetti/omarchy-evergarden"),
    ("felix", "https://github.com/TyRichards/omarchy-felix-theme"),
    ("fireside", "https://github.com/bjarneo/omarchy-fireside-theme"),
    ("flexoki-dark", "https://github.com/euandeas/omarchy-flexoki-dark-theme"),
    ("forest-green", "https://github.com/abhijeet-swami/omarchy-forest-green-theme"),
    ("frost", "https://github.com/bjarneo/omarchy-frost-theme"),
    ("futurism", "https://github.com/bjarneo/omarchy-futurism-theme"),
    ("gold-rush", "https://github.com/tahayvr/omarchy-gold-rush-theme"),
    ("green-garden", "https://github.com/kalk-ak/omarchy-green-garden-theme"),
    ("gruvu", "https://github.com/ankur311sudo/gruvu"),
    ("infernium-dark", "https://github.com/RiO7MAKK3R/omarchy-infernium-dark-theme"),
    ("mapquest", "https://github.com/ItsABigIgloo/omarchy-mapquest-theme"),
    ("mars", "https://github.com/steve-lohmeyer/omarchy-mars-theme"),
    ("mechanoonna", "https://github.com/HANCORE-linux/omarchy-mechanoonna-theme"),
    ("miasma", "https://github.com/OldJobobo/omarchy-miasma-theme"),
    ("midnight", "https://github.com/JaxonWright/omarchy-midnight-theme"),
    ("milkmatcha-light", "https://github.com/hipsterusername/omarchy-milkmatcha-light-theme"),
    ("monochrome", "https://github.com/Swarnim114/omarchy-monochrome-theme"),
    ("monokai", "https://github.com/bjarneo/omarchy-monokai-theme"),
    ("nagai-poolside", "https://github.com/somerocketeer/omarchy-nagai-poolside-theme"),
    ("neo-sploosh", "https://github.com/monoooki/omarchy-neo-sploosh-theme"),
    ("neovoid", "https://github.com/RiO7MAKK3R/omarchy-neovoid-theme"),
    ("nes", "https://github.com/bjarneo/omarchy-nes-theme"),
    ("omacarchy", "https://github.com/RiO7MAKK3R/omarchy-omacarchy-theme"),
    ("one-dark-pro", "https://github.com/sc0ttman/omarchy-one-dark-pro-theme"),
    ("pandora", "https://github.com/imbypass/omarchy-pandora-theme"),
    ("pina", "https://github.com/bjarneo/omarchy-pina-theme"),
    ("pink-blood-omarchy", "https://github.com/ITSZXY/pink-blood-omarchy-theme"),
    ("pulsar", "https://github.com/bjarneo/omarchy-pulsar-theme"),
    ("purple-moon", "https://github.com/Grey-007/purple-moon"),
    ("purplewave", "https://github.com/dotsilva/omarchy-purplewave-theme"),
    ("rainynight", "https://github.com/atif-1402/omarchy-rainynight-theme"),
    ("retropc", "https://github.com/rondilley/omarchy-retropc-theme"),
    ("rose-pine-dark", "https://github.com/guilhermetk/omarchy-rose-pine-dark"),
    ("roseofdune", "https://github.com/HANCORE-linux/omarchy-roseofdune-theme"),
    ("sakura", "https://github.com/bjarneo/omarchy-sakura-theme"),
    ("sapphire", "https://github.com/HANCORE-linux/omarchy-sapphire-theme"),
    ("shadesofjade", "https://github.com/HANCORE-linux/omarchy-shadesofjade-theme"),
    ("snow", "https://github.com/bjarneo/omarchy-snow-theme"),
    ("solarized", "https://github.com/Gazler/omarchy-solarized-theme"),
    ("solarized-light", "https://github.com/dfrico/omarchy-solarized-light-theme"),
    ("solarizedosaka", "https://github.com/motorsss/omarchy-solarizedosaka-theme"),
    ("space-monkey", "https://github.com/TyRichards/omarchy-space-monkey-theme"),
    ("sunset", "https://github.com/rondilley/omarchy-sunset-theme"),
    ("sunset-drive", "https://github.com/tahayvr/omarchy-sunset-drive-theme"),
    ("super-game-bro", "https://github.com/TyRichards/omarchy-super-game-bro-theme"),
    ("synthwave84", "https://github.com/omacom-io/omarchy-synthwave84-theme"),
    ("temerald", "https://github.com/Ahmad-Mtr/omarchy-temerald-theme"),
    ("thegreek", "https://github.com/HANCORE-linux/omarchy-thegreek-theme"),
    ("tokyoled", "https://github.com/Justin-De-Sio/omarchy-tokyoled-theme"),
    ("tycho", "https://github.com/leonardobetti/omarchy-tycho"),
    ("van-gogh", "https://github.com/Nirmal314/omarchy-van-gogh-theme"),
    ("vesper", "https://github.com/thmoee/omarchy-vesper-theme"),
    ("vhs80", "https://github.com/tahayvr/omarchy-vhs80-theme"),
    ("void", "https://github.com/vyrx-dev/omarchy-void-theme"),
    ("waveform-dark", "https://github.com/hipsterusername/omarchy-waveform-dark-theme"),
    ("whitegold", "https://github.com/HANCORE-linux/omarchy-whitegold-theme"),
];

/// Themes with a light background whose names do not say so.
pub const LIGHT_THEMES: &[&str] = &[
    "bliss",
    "catppuccin-latte",
    "flexoki-light",
    "frost",
    "milkmatcha-light",
    "snow",
    "snow_black",
    "solarized-light",
    "whitegold",
];

const GITHUB_HOST: &str = "github.com";

/// A GitHub repository a theme is installed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThemeSource {
    /// Repository URL as given
    pub url: String,
    /// Repository owner
    pub owner: String,
    /// Repository name without a `.git` suffix
    pub repo: String,
    /// Branch named in a `/tree/<branch>` URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

impl ThemeSource {
    /// Parse `https://github.com/<owner>/<repo>[.git][/]`, optionally followed
    /// by `/tree/<branch>`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSource`] for anything else.
    pub fn parse(url: &str) -> Result<Self> {
        let invalid = || Error::InvalidSource(url.to_string());

        let trimmed = url.trim();
        let rest = trimmed
            .strip_prefix("https://")
            .or_else(|| trimmed.strip_prefix("http://"))
            .ok_or_else(invalid)?;
        let rest = rest.strip_prefix("www.").unwrap_or(rest);
        let path = rest
            .strip_prefix(GITHUB_HOST)
            .and_then(|p| p.strip_prefix('/'))
            .ok_or_else(invalid)?;

        let mut segments = path.split('/').filter(|s| !s.is_empty());
        let owner = segments.next().ok_or_else(invalid)?;
        let repo = segments.next().ok_or_else(invalid)?;
        let repo = repo.strip_suffix(".git").unwrap_or(repo);

        let branch = match (segments.next(), segments.next()) {
            (None, _) => None,
            (Some("tree"), Some(branch)) if segments.next().is_none() => {
                Some(branch.to_string())
            }
            _ => return Err(invalid()),
        };

        if !is_segment(owner) || !is_segment(repo) {
            return Err(invalid());
        }

        Ok(Self {
            url: trimmed.to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
            branch,
        })
    }

    /// Repository URL handed to the install command. Any `/tree/<branch>`
    /// suffix or `.git` extension is dropped.
    #[must_use]
    pub fn clone_url(&self) -> String {
        format!("https://{GITHUB_HOST}/{}/{}", self.owner, self.repo)
    }

    /// Directory names the install command may create for this source.
    ///
    /// The catalog name comes first, followed by the repository name with
    /// the `omarchy-` prefix and `-theme` suffix removed.
    #[must_use]
    pub fn install_dir_candidates(&self, name: &str) -> Vec<String> {
        let stripped = self.repo.strip_prefix("omarchy-").unwrap_or(&self.repo);
        let stripped = stripped.strip_suffix("-theme").unwrap_or(stripped);

        let mut candidates = vec![name.to_string()];
        if !stripped.is_empty() && stripped != name {
            candidates.push(stripped.to_string());
        }
        candidates
    }

    /// Raw content URL of `file` on `branch`.
    #[must_use]
    pub fn raw_url(&self, base: &str, branch: &str, file: &str) -> String {
        format!(
            "{}/{}/{}/{branch}/{file}",
            base.trim_end_matches('/'),
            self.owner,
            self.repo
        )
    }

    /// Contents API URL listing `dir` on `branch`.
    #[must_use]
    pub fn contents_url(&self, api_base: &str, dir: &str, branch: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{dir}?ref={branch}",
            api_base.trim_end_matches('/'),
            self.owner,
            self.repo
        )
    }
}

fn is_segment(s: &str) -> bool {
    !s.is_empty()
        && s != "."
        && s != ".."
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Immutable theme name to source mapping plus the light classification set.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: BTreeMap<String, ThemeSource>,
    light: BTreeSet<String>,
}

impl Catalog {
    /// Build a catalog from explicit entries and light names.
    #[must_use]
    pub fn new(
        entries: impl IntoIterator<Item = (String, ThemeSource)>,
        light: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            entries: entries.into_iter().collect(),
            light: light.into_iter().collect(),
        }
    }

    /// The built-in official catalog.
    #[must_use]
    pub fn official() -> Self {
        let entries = OFFICIAL_THEMES.iter().filter_map(|(name, url)| {
            ThemeSource::parse(url)
                .ok()
                .map(|source| ((*name).to_string(), source))
        });
        Self::new(entries, LIGHT_THEMES.iter().map(|s| (*s).to_string()))
    }

    /// Build the catalog described by the `[catalog]` config section.
    ///
    /// Extra entries override official entries of the same name.
    ///
    /// # Errors
    ///
    /// Returns an error if an extra entry has an invalid name or URL.
    pub fn from_config(config: &CatalogConfig) -> Result<Self> {
        let mut catalog = if config.include_official {
            Self::official()
        } else {
            Self::new([], LIGHT_THEMES.iter().map(|s| (*s).to_string()))
        };

        for (name, url) in &config.extra {
            theme::validate_name(name)?;
            catalog.entries.insert(name.clone(), ThemeSource::parse(url)?);
        }
        catalog.light.extend(config.light_themes.iter().cloned());

        Ok(catalog)
    }

    /// Look up a theme's source.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ThemeSource> {
        self.entries.get(name)
    }

    /// Whether the catalog lists `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ThemeSource)> {
        self.entries.iter().map(|(name, source)| (name.as_str(), source))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Classify a theme. Works for names outside the catalog too.
    #[must_use]
    pub fn mode(&self, name: &str) -> ThemeMode {
        if self.light.contains(name) || name.to_lowercase().contains("light") {
            ThemeMode::Light
        } else {
            ThemeMode::Dark
        }
    }
}
