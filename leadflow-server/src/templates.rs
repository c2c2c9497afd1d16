//! Nurturing email templates and sequence scheduling

use chrono::{DateTime, Duration, Utc};
use leadflow_core::{EmailSequenceRecord, Persona, SequenceStatus};

use crate::crypto::generate_id;
use crate::store::{EmailTemplate, LeadStore, StoreResult};

/// Values substituted into `{{placeholder}}` markers
#[derive(Debug, Clone, Default)]
pub struct TemplateVars<'a> {
    pub first_name: &'a str,
    pub guide_title: &'a str,
    pub guide_url: &'a str,
    pub city: &'a str,
}

/// Replace the known placeholders; unknown markers are left as they are
pub fn render(text: &str, vars: &TemplateVars<'_>) -> String {
    text.replace("{{firstName}}", vars.first_name)
        .replace("{{guideTitle}}", vars.guide_title)
        .replace("{{guideUrl}}", vars.guide_url)
        .replace("{{city}}", vars.city)
}

struct Step {
    step: u32,
    email_type: &'static str,
    delay_days: i64,
    subject: &'static str,
    body: &'static str,
}

const DELIVERY: Step = Step {
    step: 1,
    email_type: "guide_delivery",
    delay_days: 0,
    subject: "Votre guide : {{guideTitle}}",
    body: "Bonjour {{firstName}},\n\n\
           Merci pour votre demande. Votre guide « {{guideTitle}} » est disponible ici :\n\
           {{guideUrl}}\n\n\
           Bonne lecture !",
};

fn persona_steps(persona: Persona) -> [Step; 3] {
    match persona {
        Persona::Presse => [
            Step {
                step: 2,
                email_type: "conseils",
                delay_days: 2,
                subject: "{{firstName}}, 3 erreurs qui ralentissent une vente",
                body: "Bonjour {{firstName}},\n\n\
                       Un prix trop haut au départ est la première cause d'une vente qui traîne. \
                       Les biens bien estimés à {{city}} partent en quelques semaines.\n\n\
                       Retrouvez le détail dans votre guide : {{guideUrl}}",
            },
            Step {
                step: 3,
                email_type: "etude_de_cas",
                delay_days: 5,
                subject: "Vendu en 41 jours près de {{city}}",
                body: "Bonjour {{firstName}},\n\n\
                       Voici comment un couple de vendeurs a obtenu une offre ferme en six semaines, \
                       diagnostics prêts et prix juste dès la première visite.",
            },
            Step {
                step: 4,
                email_type: "appel_a_l_action",
                delay_days: 9,
                subject: "On estime votre bien cette semaine ?",
                body: "Bonjour {{firstName}},\n\n\
                       Un conseiller peut passer à {{city}} pour un avis de valeur gratuit. \
                       Répondez simplement à cet email pour convenir d'un créneau.",
            },
        ],
        Persona::Investisseur => [
            Step {
                step: 2,
                email_type: "conseils",
                delay_days: 2,
                subject: "Rendement brut ou net : le calcul qui change tout",
                body: "Bonjour {{firstName}},\n\n\
                       Charges, vacance locative et fiscalité réduisent souvent un rendement de moitié. \
                       Le chapitre 1 de « {{guideTitle}} » détaille le calcul : {{guideUrl}}",
            },
            Step {
                step: 3,
                email_type: "etude_de_cas",
                delay_days: 5,
                subject: "Un T2 meublé à 5,8 % net en Gironde",
                body: "Bonjour {{firstName}},\n\n\
                       Retour sur un investissement récent : prix d'achat, travaux, loyer et \
                       rendement après impôts.",
            },
            Step {
                step: 4,
                email_type: "appel_a_l_action",
                delay_days: 9,
                subject: "Des biens à rendement autour de {{city}}",
                body: "Bonjour {{firstName}},\n\n\
                       Nous sélectionnons des biens adaptés à l'investissement locatif. \
                       Répondez à cet email pour recevoir les prochaines opportunités.",
            },
        ],
        Persona::Heritier => [
            Step {
                step: 2,
                email_type: "conseils",
                delay_days: 2,
                subject: "Succession : les délais à connaître",
                body: "Bonjour {{firstName}},\n\n\
                       La déclaration de succession doit être déposée dans les six mois. \
                       L'estimation du bien en fait partie, tout est expliqué ici : {{guideUrl}}",
            },
            Step {
                step: 3,
                email_type: "etude_de_cas",
                delay_days: 5,
                subject: "Trois héritiers, une maison : comment ils ont décidé",
                body: "Bonjour {{firstName}},\n\n\
                       Vendre, louer ou racheter les parts : l'exemple d'une fratrie qui a \
                       trouvé un accord en quelques semaines.",
            },
            Step {
                step: 4,
                email_type: "appel_a_l_action",
                delay_days: 9,
                subject: "Une estimation pour le notaire",
                body: "Bonjour {{firstName}},\n\n\
                       Nous réalisons des avis de valeur reconnus par les notaires à {{city}}. \
                       Répondez à cet email pour être rappelé.",
            },
        ],
        Persona::General => [
            Step {
                step: 2,
                email_type: "conseils",
                delay_days: 2,
                subject: "Ce qui fait vraiment le prix d'un bien à {{city}}",
                body: "Bonjour {{firstName}},\n\n\
                       Emplacement, état, étage, extérieur : voici les critères qui pèsent le plus \
                       dans une estimation. Votre guide : {{guideUrl}}",
            },
            Step {
                step: 3,
                email_type: "etude_de_cas",
                delay_days: 5,
                subject: "Estimation en ligne et prix de vente réel",
                body: "Bonjour {{firstName}},\n\n\
                       Nous avons comparé cent estimations en ligne aux prix de vente constatés. \
                       L'écart moyen vous surprendra.",
            },
            Step {
                step: 4,
                email_type: "appel_a_l_action",
                delay_days: 9,
                subject: "Un avis de valeur gratuit ?",
                body: "Bonjour {{firstName}},\n\n\
                       Un conseiller local peut affiner l'estimation de votre bien à {{city}}. \
                       Répondez à cet email pour convenir d'un rendez-vous.",
            },
        ],
    }
}

fn to_template(persona: Persona, step: &Step) -> EmailTemplate {
    EmailTemplate {
        persona,
        sequence_step: step.step,
        email_type: step.email_type.to_string(),
        subject: step.subject.to_string(),
        body: step.body.to_string(),
        delay_days: step.delay_days,
    }
}

/// Built-in templates for one persona, ordered by step
pub fn default_templates_for(persona: Persona) -> Vec<EmailTemplate> {
    let mut templates = vec![to_template(persona, &DELIVERY)];
    templates.extend(persona_steps(persona).iter().map(|s| to_template(persona, s)));
    templates
}

/// Built-in templates for every persona
pub fn default_templates() -> Vec<EmailTemplate> {
    Persona::ALL
        .iter()
        .flat_map(|p| default_templates_for(*p))
        .collect()
}

/// Templates a new sequence uses: stored ones for the persona, else the
/// stored general ones, else the built-in set
pub fn sequence_templates<L: LeadStore>(store: &L, persona: Persona) -> StoreResult<Vec<EmailTemplate>> {
    let stored = store.templates_for(persona)?;
    if !stored.is_empty() {
        return Ok(stored);
    }
    if persona != Persona::General {
        let general = store.templates_for(Persona::General)?;
        if !general.is_empty() {
            return Ok(general);
        }
    }
    Ok(default_templates_for(persona))
}

/// Template for one step, with the same fallback order as [`sequence_templates`]
pub fn template_for_step<L: LeadStore>(
    store: &L,
    persona: Persona,
    step: u32,
) -> StoreResult<Option<EmailTemplate>> {
    let find = |templates: Vec<EmailTemplate>| templates.into_iter().find(|t| t.sequence_step == step);

    if let Some(t) = find(store.templates_for(persona)?) {
        return Ok(Some(t));
    }
    if let Some(t) = find(store.templates_for(Persona::General)?) {
        return Ok(Some(t));
    }
    Ok(find(default_templates_for(persona)))
}

/// One scheduled record per template, `delay_days` after `now`
pub fn schedule_sequence(
    templates: &[EmailTemplate],
    guide_slug: &str,
    lead_email: &str,
    persona: Persona,
    now: DateTime<Utc>,
) -> Vec<EmailSequenceRecord> {
    templates
        .iter()
        .map(|t| EmailSequenceRecord {
            id: generate_id(),
            guide_id: guide_slug.to_string(),
            lead_email: lead_email.to_string(),
            persona,
            sequence_step: t.sequence_step,
            email_type: t.email_type.clone(),
            scheduled_for: now + Duration::days(t.delay_days),
            sent_at: None,
            status: SequenceStatus::Scheduled,
            created_at: now,
        })
        .collect()
}
