//! Guide catalog
//!
//! Guides are fixed content; the PDFs live in the guides directory as
//! `<slug>.pdf`.

use std::path::{Path, PathBuf};

use leadflow_core::Persona;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Guide {
    pub slug: &'static str,
    pub title: &'static str,
    /// Persona the guide is written for; default for its email sequence
    pub persona: Persona,
    pub summary: &'static str,
    pub sections: &'static [&'static str],
}

impl Guide {
    pub fn pdf_path(&self, guides_dir: &Path) -> PathBuf {
        guides_dir.join(format!("{}.pdf", self.slug))
    }

    pub fn pdf_file_name(&self) -> String {
        format!("{}.pdf", self.slug)
    }

    /// Path of the reading page
    pub fn read_path(&self) -> String {
        format!("/guides/{}/lire", self.slug)
    }
}

static GUIDES: &[Guide] = &[
    Guide {
        slug: "vendre-rapidement-bordeaux",
        title: "Vendre rapidement à Bordeaux",
        persona: Persona::Presse,
        summary: "Les étapes pour vendre en moins de 90 jours sans brader son bien.",
        sections: &[
            "Fixer le bon prix dès la mise en vente",
            "Préparer les diagnostics en avance",
            "Choisir entre mandat simple et exclusif",
            "Négocier une offre ferme",
        ],
    },
    Guide {
        slug: "investir-immobilier-gironde",
        title: "Investir dans l'immobilier en Gironde",
        persona: Persona::Investisseur,
        summary: "Rendements, fiscalité et secteurs porteurs de la métropole et du bassin.",
        sections: &[
            "Lire un rendement locatif net",
            "Les quartiers en tension locative",
            "Location nue ou meublée",
            "Financer et revendre",
        ],
    },
    Guide {
        slug: "heritage-immobilier-succession",
        title: "Bien immobilier reçu en héritage",
        persona: Persona::Heritier,
        summary: "Indivision, estimation pour la déclaration de succession et options de vente.",
        sections: &[
            "Les délais de la succession",
            "Faire estimer le bien pour le notaire",
            "Sortir de l'indivision",
            "Vendre, louer ou conserver",
        ],
    },
    Guide {
        slug: "estimer-son-bien-gironde",
        title: "Estimer son bien en Gironde",
        persona: Persona::General,
        summary: "Comprendre les prix au m² et ce qui fait varier la valeur d'un bien.",
        sections: &[
            "Prix au m² par commune",
            "Les critères qui pèsent sur le prix",
            "Estimation en ligne ou avis de valeur",
        ],
    },
];

/// Every published guide
pub fn all() -> &'static [Guide] {
    GUIDES
}

pub fn find(slug: &str) -> Option<&'static Guide> {
    GUIDES.iter().find(|g| g.slug == slug)
}
