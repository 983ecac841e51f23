//! Static Darwin Core vocabularies and default synonym tables.
//!
//! Each table is `(id, value)` in id order; synonyms are `(text, id)`.

pub const BASIS_OF_RECORD: &[(i32, &str)] = &[
    (0, "HumanObservation"),
    (1, "PreservedSpecimen"),
    (2, "FossilSpecimen"),
    (3, "LivingSpecimen"),
    (4, "MachineObservation"),
    (5, "MaterialSample"),
    (6, "Occurrence"),
    (7, "MaterialCitation"),
];

pub const BASIS_OF_RECORD_SYNONYMS: &[(&str, i32)] = &[
    ("Observation", 0),
    ("observation", 0),
    ("Human observation", 0),
    ("specimen", 1),
    ("Specimen", 1),
    ("Preserved specimen", 1),
    ("S", 1),
    ("Fossil specimen", 2),
    ("Living specimen", 3),
    ("Machine observation", 4),
    ("Material sample", 5),
];

pub const CONTINENT: &[(i32, &str)] = &[
    (0, "Africa"),
    (1, "Antarctica"),
    (2, "Asia"),
    (3, "Oceania"),
    (4, "Europe"),
    (5, "NorthAmerica"),
    (6, "SouthAmerica"),
];

pub const CONTINENT_SYNONYMS: &[(&str, i32)] = &[
    ("Australia", 3),
    ("North America", 5),
    ("South America", 6),
    ("Afrika", 0),
    ("Antarktis", 1),
    ("Asien", 2),
    ("Oceanien", 3),
    ("Europa", 4),
    ("Nordamerika", 5),
    ("Sydamerika", 6),
];

pub const OCCURRENCE_STATUS: &[(i32, &str)] = &[(0, "present"), (1, "absent")];

pub const OCCURRENCE_STATUS_SYNONYMS: &[(&str, i32)] = &[
    ("Present", 0),
    ("PRESENT", 0),
    ("detected", 0),
    ("Absent", 1),
    ("ABSENT", 1),
    ("not detected", 1),
    ("notDetected", 1),
];

pub const ACCESS_RIGHTS: &[(i32, &str)] = &[
    (0, "FreeUsage"),
    (1, "NotForPublicUsage"),
    (2, "NotForPublicUsageIfProtected"),
];

pub const ACCESS_RIGHTS_SYNONYMS: &[(&str, i32)] = &[
    ("free usage", 0),
    ("Free", 0),
    ("not for public usage", 1),
];

pub const ESTABLISHMENT_MEANS: &[(i32, &str)] = &[
    (0, "native"),
    (1, "nativeReintroduced"),
    (2, "introduced"),
    (3, "introducedAssistedColonisation"),
    (4, "vagrant"),
    (5, "uncertain"),
];

pub const ESTABLISHMENT_MEANS_SYNONYMS: &[(&str, i32)] = &[
    ("Native", 0),
    ("indigenous", 0),
    ("reintroduced", 1),
    ("Introduced", 2),
    ("alien", 2),
    ("exotic", 2),
    ("non-native", 2),
    ("naturalised", 2),
    ("casual", 4),
    ("cryptogenic", 5),
    ("unknown", 5),
];

pub const SEX_SYNONYMS: &[(&str, i32)] = &[
    ("male", 1),
    ("female", 2),
    ("M", 1),
    ("F", 2),
    ("hane", 1),
    ("hona", 2),
];

pub const LIFE_STAGE_SYNONYMS: &[(&str, i32)] = &[
    ("adult", 1),
    ("Adult", 1),
    ("imago", 1),
    ("egg", 8),
    ("eggs", 8),
    ("larva", 9),
    ("larvae", 9),
    ("pupa", 10),
];

pub const VERIFICATION_STATUS_SYNONYMS: &[(&str, i32)] = &[
    ("verified", 0),
    ("Verified", 0),
    ("unverified", 10),
    ("Unverified", 10),
];
