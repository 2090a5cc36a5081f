//! Hard-coded per-category knowledge that does not live in the rule tables.
//!
//! Each built-in category gets a [`CategoryProfile`]:
//! - identity keywords that, in a subject line, decide the category outright
//! - specific-sender heuristics for well-known institutional senders
//! - its position within the high-priority tier
//!
//! Categories without a profile (e.g. ones added through a custom rule file)
//! get no identity keywords, no sender heuristics, and the general rank.

use super::sender::{SenderContext, SpecificSender, extract_professor_title};
use crate::rules::word_regex;

/// A single test against a sender. All string operands are lowercase.
#[derive(Debug, Clone, Copy)]
pub enum SenderCheck {
    DomainContains(&'static str),
    DomainStartsWith(&'static str),
    /// Substring of the full raw sender string.
    SenderContains(&'static str),
    /// Substring of the extracted display name.
    NameContains(&'static str),
    /// Any academic title recognised by `extract_professor_title`.
    ProfessorTitle,
    Any(&'static [SenderCheck]),
    All(&'static [SenderCheck]),
}

impl SenderCheck {
    pub fn holds(&self, sender: &SenderContext<'_>) -> bool {
        match self {
            Self::DomainContains(s) => sender.domain.contains(s),
            Self::DomainStartsWith(s) => sender.domain.starts_with(s),
            Self::SenderContains(s) => sender.lower.contains(s),
            Self::NameContains(s) => sender.name.contains(s),
            Self::ProfessorTitle => extract_professor_title(sender.raw).is_some(),
            Self::Any(checks) => checks.iter().any(|c| c.holds(sender)),
            Self::All(checks) => checks.iter().all(|c| c.holds(sender)),
        }
    }
}

/// A heuristic that fires when any of its checks holds.
#[derive(Debug, Clone, Copy)]
pub struct SenderRule {
    pub any_of: &'static [SenderCheck],
    pub confidence: f64,
    pub pattern: &'static str,
}

/// Rank of a category inside the high-priority tier (lower runs first).
#[derive(Debug, Clone, Copy)]
pub struct HighTierRank {
    pub base: u32,
    /// Rank used instead of `base` when the sender carries this signature.
    pub float: Option<(u32, &'static [SenderCheck])>,
}

/// Rank for high-tier categories with no special placement.
pub const GENERAL_RANK: u32 = 5;

impl HighTierRank {
    const GENERAL: Self = Self {
        base: GENERAL_RANK,
        float: None,
    };

    pub fn resolve(&self, sender: &SenderContext<'_>) -> u32 {
        match self.float {
            Some((slot, signature)) if signature.iter().any(|c| c.holds(sender)) => slot,
            _ => self.base,
        }
    }
}

#[derive(Debug)]
pub struct CategoryProfile {
    pub name: &'static str,
    /// Narrow subject-line terms, distinct from the rule table's keywords.
    pub identity_keywords: &'static [&'static str],
    /// Tried in order; the first rule that fires wins.
    pub sender_rules: &'static [SenderRule],
    /// Sender-match confidence at which this category is decided before any
    /// other category is evaluated.
    pub sender_override: Option<f64>,
    pub rank: HighTierRank,
}

impl CategoryProfile {
    /// Whether the subject names this category. Multi-word entries match as
    /// plain substrings, single words on word boundaries.
    pub fn subject_mentions(&self, subject: &str) -> Option<&'static str> {
        if subject.is_empty() {
            return None;
        }
        let lower = subject.to_lowercase();
        self.identity_keywords.iter().copied().find(|keyword| {
            if keyword.contains(' ') {
                lower.contains(keyword)
            } else {
                word_regex(keyword).is_some_and(|re| re.is_match(&lower))
            }
        })
    }

    pub fn match_sender(&self, sender: &SenderContext<'_>) -> Option<SpecificSender> {
        self.sender_rules
            .iter()
            .find(|rule| rule.any_of.iter().any(|c| c.holds(sender)))
            .map(|rule| SpecificSender {
                confidence: rule.confidence,
                pattern: rule.pattern,
            })
    }
}

/// Profile for a category name, if it is one of the built-ins.
pub fn profile(name: &str) -> Option<&'static CategoryProfile> {
    PROFILES.iter().find(|p| p.name == name)
}

/// High-tier rank for a category given the sender.
pub fn high_tier_rank(name: &str, sender: &SenderContext<'_>) -> u32 {
    profile(name).map_or(GENERAL_RANK, |p| p.rank.resolve(sender))
}

use SenderCheck::{
    All, Any, DomainContains, DomainStartsWith, NameContains, ProfessorTitle, SenderContains,
};

const PROMOTIONS_SIGNATURE: &[SenderCheck] = &[
    SenderContains("'promotions' via"),
    SenderContains("promotions via"),
    SenderContains("promotions' via"),
];

const WHATS_HAPPENING_SIGNATURE: &[SenderCheck] = &[
    SenderContains("what's happening"),
    SenderContains("whats happening"),
    SenderContains("batch2022-2023"),
];

const HOD_SIGNATURE: &[SenderCheck] = &[
    SenderContains("hod cse"),
    SenderContains("hod "),
    DomainContains("hod."),
    DomainStartsWith("hod"),
    SenderContains("head of department"),
    SenderContains("head of dept"),
];

static PROFILES: &[CategoryProfile] = &[
    CategoryProfile {
        name: "HOD",
        identity_keywords: &["hod", "head of department", "dept head"],
        sender_rules: &[
            SenderRule {
                any_of: &[All(&[DomainContains("hod."), DomainContains("sharda.ac.in")])],
                confidence: 0.98,
                pattern: "HOD domain",
            },
            SenderRule {
                any_of: &[
                    SenderContains("hod cse"),
                    SenderContains("hod ece"),
                    SenderContains("hod me"),
                    SenderContains("hod ce"),
                    SenderContains("hod "),
                    NameContains("hod"),
                    SenderContains("head of department"),
                    SenderContains("head of dept"),
                ],
                confidence: 0.95,
                pattern: "HOD sender",
            },
        ],
        sender_override: None,
        rank: HighTierRank {
            base: 3,
            float: Some((2, HOD_SIGNATURE)),
        },
    },
    CategoryProfile {
        name: "NPTEL",
        identity_keywords: &["nptel", "swayam", "mooc", "online course"],
        sender_rules: &[SenderRule {
            any_of: &[
                DomainContains("nptel.iitm.ac.in"),
                DomainContains("nptel.ac.in"),
                SenderContains("onlinecourses@nptel"),
                SenderContains("swayam.gov.in"),
            ],
            confidence: 0.95,
            pattern: "NPTEL sender",
        }],
        sender_override: None,
        rank: HighTierRank::GENERAL,
    },
    CategoryProfile {
        name: "Professor",
        identity_keywords: &["professor", "assignment", "quiz", "viva", "class test"],
        sender_rules: &[
            SenderRule {
                any_of: &[
                    NameContains("nishant gupta"),
                    NameContains("kanika singla"),
                    NameContains("anubhava srivastava"),
                    NameContains("kapil kumar"),
                    NameContains("preeti sharma"),
                ],
                confidence: 0.95,
                pattern: "Professor name match",
            },
            SenderRule {
                any_of: &[ProfessorTitle],
                confidence: 0.92,
                pattern: "Professor title",
            },
            SenderRule {
                any_of: &[All(&[
                    DomainContains("sharda.ac.in"),
                    Any(&[
                        NameContains("professor"),
                        NameContains("dr."),
                        NameContains("faculty"),
                    ]),
                ])],
                confidence: 0.88,
                pattern: "Professor domain + name",
            },
        ],
        sender_override: Some(0.88),
        rank: HighTierRank {
            base: 4,
            float: None,
        },
    },
    CategoryProfile {
        name: "Placement",
        identity_keywords: &[
            "placement",
            "recruitment",
            "hiring",
            "internship",
            "campus drive",
            "off-campus",
            "pool campus",
        ],
        sender_rules: &[SenderRule {
            any_of: &[
                SenderContains("placement"),
                SenderContains("recruitment"),
                SenderContains("career services"),
                SenderContains("talent acquisition"),
                SenderContains("campus hiring"),
                SenderContains("shardainformatics.com"),
            ],
            confidence: 0.95,
            pattern: "Placement sender",
        }],
        sender_override: None,
        rank: HighTierRank::GENERAL,
    },
    CategoryProfile {
        name: "Promotions",
        identity_keywords: &["promotions", "promotion", "discount"],
        sender_rules: &[
            SenderRule {
                any_of: &[
                    SenderContains("'promotions' via"),
                    SenderContains("\"promotions\" via"),
                    SenderContains("promotions' via"),
                    SenderContains("promotions via"),
                ],
                confidence: 0.95,
                pattern: "Promotions sender",
            },
            SenderRule {
                any_of: &[DomainContains("shardacare.com"), SenderContains("healthcity")],
                confidence: 0.98,
                pattern: "HealthCity/ShardaCare sender",
            },
            SenderRule {
                any_of: &[NameContains("promotions")],
                confidence: 0.90,
                pattern: "Promotions in sender name",
            },
        ],
        sender_override: None,
        rank: HighTierRank {
            base: GENERAL_RANK,
            float: Some((0, PROMOTIONS_SIGNATURE)),
        },
    },
    CategoryProfile {
        name: "Whats happening",
        identity_keywords: &[
            "what's happening",
            "whats happening",
            "hackathon",
            "fest",
            "workshop",
            "seminar",
        ],
        sender_rules: &[SenderRule {
            any_of: &[
                SenderContains("'what's happening' via"),
                SenderContains("what's happening via"),
                SenderContains("whatshappening@"),
            ],
            confidence: 0.92,
            pattern: "Whats happening sender",
        }],
        sender_override: None,
        rank: HighTierRank {
            base: GENERAL_RANK,
            float: Some((1, WHATS_HAPPENING_SIGNATURE)),
        },
    },
    CategoryProfile {
        name: "E-Zone",
        identity_keywords: &["e-zone", "ezone", "sharda portal", "student portal"],
        sender_rules: &[SenderRule {
            any_of: &[
                SenderContains("ezone@shardauniversity.com"),
                SenderContains("e-zone online portal"),
                DomainContains("ezone"),
            ],
            confidence: 0.98,
            pattern: "E-Zone sender",
        }],
        sender_override: None,
        rank: HighTierRank::GENERAL,
    },
    CategoryProfile {
        name: "Other",
        identity_keywords: &[],
        sender_rules: &[
            SenderRule {
                any_of: &[
                    DomainContains("service-now.com"),
                    DomainContains("servicenow.com"),
                    DomainContains("nowlearning.com"),
                ],
                confidence: 0.95,
                pattern: "ServiceNow domain",
            },
            SenderRule {
                any_of: &[
                    SenderContains("servicenow university"),
                    SenderContains("nowlearning@"),
                ],
                confidence: 0.95,
                pattern: "ServiceNow sender",
            },
            SenderRule {
                any_of: &[DomainContains("openai.com"), DomainContains("chatgpt.com")],
                confidence: 0.95,
                pattern: "OpenAI/ChatGPT domain",
            },
            SenderRule {
                any_of: &[SenderContains("chatgpt"), SenderContains("openai")],
                confidence: 0.95,
                pattern: "OpenAI/ChatGPT sender",
            },
            SenderRule {
                any_of: &[DomainContains("github.com"), SenderContains("github")],
                confidence: 0.95,
                pattern: "GitHub sender",
            },
        ],
        sender_override: None,
        rank: HighTierRank {
            base: 9,
            float: None,
        },
    },
];

/// Sender domains of institutional systems that belong in the catch-all
/// when nothing else matched.
pub fn is_service_now_domain(domain: &str) -> bool {
    ["service-now.com", "servicenow.com", "nowlearning.com"]
        .iter()
        .any(|d| domain.contains(d))
}
