//! Built-in calibration knowledge, used whenever the online source is
//! unavailable. Everything here is static data.

use crate::cleaner::clean_brand;
use crate::{CalibrationProcedure, DurationRange};
use chrono::{DateTime, Utc};

pub const KNOWLEDGE_BASE_SOURCE: &str = "Base de Conhecimento Bosch";
pub const GENERIC_SOURCE: &str = "Base de Conhecimento Genérica";

/// Notes added when the upper-cased model name contains any of `needles`.
pub struct ModelNotes {
    pub needles: &'static [&'static str],
    pub notes: &'static [&'static str],
}

/// Notes added when the model year is at least `min_year`.
pub struct YearNotes {
    pub min_year: i32,
    pub notes: &'static [&'static str],
}

pub struct BrandProcedure {
    pub brand: &'static str,
    pub source: &'static str,
    pub calibration_types: &'static [&'static str],
    pub steps: &'static [&'static str],
    pub requirements: &'static [&'static str],
    pub warnings: &'static [&'static str],
    pub duration: DurationRange,
    pub equipment: &'static [&'static str],
    /// First matching row wins.
    pub model_notes: &'static [ModelNotes],
    /// Ordered newest first; first matching bracket wins.
    pub year_notes: &'static [YearNotes],
}

pub static BMW: BrandProcedure = BrandProcedure {
    brand: "BMW",
    source: KNOWLEDGE_BASE_SOURCE,
    calibration_types: &["Calibração Dinâmica", "Calibração Estática"],
    steps: &[
        "Conectar DAS 3000 ou equipamento compatível BMW",
        "Verificar códigos de defeito e limpar se necessário",
        "Verificar pressão dos pneus conforme especificação BMW",
        "Selecionar \"BMW\" → \"Sistemas ADAS\" no equipamento",
        "Escolher tipo de calibração (Estática/Dinâmica)",
        "Seguir procedimento guiado no equipamento",
        "Realizar test drive para validação (se dinâmica)",
        "Verificar funcionamento de todos os sistemas ADAS",
        "Confirmar calibração e gerar relatório",
    ],
    requirements: &[
        "Equipamento DAS 3000 ou compatível BMW",
        "Superfície plana e nivelada para calibração estática",
        "Pista de teste adequada para calibração dinâmica",
        "Condições climáticas favoráveis (sem chuva intensa)",
        "Pneus calibrados conforme especificação do fabricante",
        "Alinhamento e geometria da direção em dia",
        "Bateria com carga mínima de 12,5V",
        "Documentação técnica BMW atualizada",
    ],
    warnings: &[
        "Verificar recalls de software antes da calibração",
        "Não realizar calibração com códigos de defeito ativos",
        "Temperatura ambiente deve estar entre 5°C e 35°C",
        "Evitar interferências eletromagnéticas durante calibração",
        "Para-brisa deve estar limpo e sem danos",
        "Não interromper processo uma vez iniciado",
    ],
    duration: DurationRange {
        min_minutes: 45,
        max_minutes: 90,
    },
    equipment: &[
        "DAS 3000 ou equipamento BMW compatível",
        "Targets de calibração específicos BMW",
        "Scanner OBD para verificação de códigos",
        "Medidor de pressão de pneus",
        "Documentação técnica atualizada",
    ],
    model_notes: &[
        ModelNotes {
            needles: &["118I"],
            notes: &[
                "Modelo com sistema de assistência de faixa padrão",
                "Verificar se possui câmera traseira integrada ao sistema",
                "Tempo de calibração típico: 45-60 minutos",
                "Sistema BMW Drive Assistant incluído",
            ],
        },
        ModelNotes {
            needles: &["X1"],
            notes: &[
                "SUV com sensores de estacionamento múltiplos",
                "Verificar altura da suspensão antes da calibração",
                "Pode requerer calibração adicional dos sensores laterais",
                "Sistema xDrive pode afetar procedimento",
            ],
        },
        ModelNotes {
            needles: &["SERIE 3", "320"],
            notes: &[
                "Modelo com múltiplos sistemas ADAS integrados",
                "Verificar versão do software iDrive",
                "Alguns anos requerem atualização antes da calibração",
                "Sistema BMW Intelligent Safety incluso",
            ],
        },
    ],
    year_notes: &[
        YearNotes {
            min_year: 2024,
            notes: &[
                "Modelo com BMW Operating System 8.5 ou superior",
                "Sistemas ADAS de última geração - calibração mais sensível",
            ],
        },
        YearNotes {
            min_year: 2020,
            notes: &["Geração intermediária - verificar atualizações disponíveis"],
        },
        YearNotes {
            min_year: 2018,
            notes: &["Primeira geração ADAS BMW - procedimentos simplificados"],
        },
    ],
};

pub static VOLKSWAGEN: BrandProcedure = BrandProcedure {
    brand: "VOLKSWAGEN",
    source: KNOWLEDGE_BASE_SOURCE,
    calibration_types: &["Calibração Estática", "Calibração Dinâmica"],
    steps: &[
        "Conectar VCDS, ODIS ou equipamento compatível",
        "Verificar e limpar códigos de defeito",
        "Posicionar veículo conforme especificações VW",
        "Instalar targets de calibração específicos VW/Audi",
        "Acessar Central de Conforto → Sistemas ADAS",
        "Executar \"Calibração da Câmera Frontal\"",
        "Aguardar conclusão sem mover o veículo",
        "Verificar funcionamento dos sistemas",
        "Realizar test drive de validação",
        "Documentar procedimento realizado",
    ],
    requirements: &[
        "VCDS, ODIS ou equipamento diagnóstico compatível",
        "Targets específicos do grupo VW/Audi",
        "Ambiente com iluminação controlada e adequada",
        "Bateria com carga mínima de 12,5V",
        "Sistema de direção centralizado e travado",
        "Superfície completamente plana e nivelada",
        "Ausência de objetos reflexivos no ambiente",
    ],
    warnings: &[
        "Respeitar distâncias exatas especificadas para targets",
        "Não mover o veículo durante calibração estática",
        "Verificar se para-brisa não possui trincas ou chips",
        "Confirmar que suspensão não foi modificada",
        "Alguns modelos requerem codificação após calibração",
        "Verificar se há atualizações de software disponíveis",
    ],
    duration: DurationRange {
        min_minutes: 30,
        max_minutes: 60,
    },
    equipment: &[
        "VCDS ou ODIS Service",
        "Targets específicos VW/Audi",
        "Multímetro para verificação da bateria",
        "Nível a laser para posicionamento",
        "Trena para medição de distâncias",
    ],
    model_notes: &[
        ModelNotes {
            needles: &["POLO"],
            notes: &[
                "Modelo compacto com sistema Front Assist",
                "Verificar se possui Lane Assist",
                "Calibração geralmente mais rápida: 30-45 minutos",
                "Sistema IQ.DRIVE simplificado",
            ],
        },
        ModelNotes {
            needles: &["GOLF"],
            notes: &[
                "Sistema IQ.DRIVE completo em versões TSI",
                "Verificar se possui Travel Assist",
                "Pode requerer atualização de mapas de navegação",
                "Emergency Assist incluído em algumas versões",
            ],
        },
        ModelNotes {
            needles: &["TIGUAN"],
            notes: &[
                "SUV com sensores 360° em versões superiores",
                "Verificar altura da suspensão variável",
                "Calibração dos sensores laterais obrigatória",
                "Sistema Park Assist incluído",
            ],
        },
    ],
    year_notes: &[],
};

pub static MERCEDES_BENZ: BrandProcedure = BrandProcedure {
    brand: "MERCEDES-BENZ",
    source: KNOWLEDGE_BASE_SOURCE,
    calibration_types: &["Calibração Estática Mercedes", "Calibração Dinâmica"],
    steps: &[
        "Conectar Star Diagnosis ou DAS 3000",
        "Selecionar modelo específico do veículo Mercedes",
        "Acessar menu \"Sistemas de Assistência ao Condutor\"",
        "Selecionar \"Calibração Radar/Câmera\"",
        "Verificar geometria e altura da suspensão",
        "Seguir procedimento guiado passo a passo",
        "Confirmar alinhamento de todos os sensores",
        "Realizar test drive de validação completo",
        "Finalizar com verificação de funcionamento",
    ],
    requirements: &[
        "Star Diagnosis ou DAS 3000 atualizado",
        "Reflectores específicos Mercedes-Benz",
        "Verificação da altura correta da suspensão",
        "Pressão dos pneus conforme especificação MB",
        "Centro de alinhamento certificado Mercedes",
        "Ambiente controlado sem interferências",
        "Acesso à rede Mercedes para atualizações",
    ],
    warnings: &[
        "Alguns modelos requerem atualização de software obrigatória",
        "Verificar se suspensão não foi modificada ou danificada",
        "Temperatura de operação: -10°C a +50°C",
        "Calibração pode requerer até 2 horas em modelos complexos",
        "Alguns sistemas requerem inicialização separada",
        "Verificar se veículo possui sistema MAGIC RIDE",
    ],
    duration: DurationRange {
        min_minutes: 60,
        max_minutes: 120,
    },
    equipment: &[
        "Star Diagnosis atualizado",
        "Reflectores específicos Mercedes-Benz",
        "Medidor de altura da suspensão",
        "Equipamento de alinhamento",
        "Documentação técnica Mercedes",
    ],
    model_notes: &[
        ModelNotes {
            needles: &["A-CLASS", "A200"],
            notes: &[
                "Classe A com Mercedes-Benz User Experience (MBUX)",
                "Sistema de assistência ativa de mudança de faixa",
                "Verificar se possui DYNAMIC SELECT",
                "Calibração integrada com sistema de infotainment",
            ],
        },
        ModelNotes {
            needles: &["C-CLASS"],
            notes: &[
                "Classe C com sistema PRE-SAFE",
                "Múltiplos sistemas ADAS integrados",
                "Verificar se possui suspensão adaptativa",
                "Sistema ATTENTION ASSIST incluso",
            ],
        },
        ModelNotes {
            needles: &["E-CLASS"],
            notes: &[
                "Classe E com sistema Drive Pilot (em alguns modelos)",
                "Calibração complexa - múltiplos sensores",
                "Verificar se possui Magic Ride Control",
                "Sistema PRESAFE PLUS incluído",
            ],
        },
    ],
    year_notes: &[],
};

/// Template for every brand without a dedicated entry. `brand` is replaced
/// by the requested brand.
pub static GENERIC: BrandProcedure = BrandProcedure {
    brand: "",
    source: GENERIC_SOURCE,
    calibration_types: &["Calibração Estática", "Calibração Dinâmica"],
    steps: &[
        "Conectar equipamento de diagnóstico compatível",
        "Verificar e limpar todos os códigos de defeito",
        "Posicionar veículo em superfície adequada",
        "Instalar equipamentos de calibração necessários",
        "Seguir procedimento específico do fabricante",
        "Realizar validação conforme manual técnico",
        "Verificar funcionamento de todos os sistemas ADAS",
    ],
    requirements: &[
        "Equipamento de diagnóstico compatível com a marca",
        "Targets/reflectores apropriados para o modelo",
        "Ambiente controlado e adequado",
        "Documentação técnica atualizada do fabricante",
    ],
    warnings: &[
        "Consultar manual técnico específico da marca",
        "Verificar atualizações de software disponíveis",
        "Respeitar todas as especificações do fabricante",
    ],
    duration: DurationRange {
        min_minutes: 45,
        max_minutes: 90,
    },
    equipment: &[
        "Scanner OBD compatível",
        "Equipamentos de calibração apropriados",
        "Manual técnico atualizado",
    ],
    model_notes: &[],
    year_notes: &[],
};

static DEDICATED: [&BrandProcedure; 3] = [&BMW, &VOLKSWAGEN, &MERCEDES_BENZ];

pub fn brand_procedure(brand: &str) -> Option<&'static BrandProcedure> {
    let brand = clean_brand(brand);
    DEDICATED.iter().copied().find(|entry| entry.brand == brand)
}

impl BrandProcedure {
    pub fn model_notes_for(&self, model: Option<&str>, year: Option<i32>) -> Vec<String> {
        let mut notes = Vec::new();

        if let Some(model) = model {
            let model = model.to_uppercase();
            if let Some(row) = self
                .model_notes
                .iter()
                .find(|row| row.needles.iter().any(|needle| model.contains(needle)))
            {
                notes.extend(row.notes.iter().map(|note| note.to_string()));
            }
        }

        if let Some(year) = year {
            if let Some(bracket) = self.year_notes.iter().find(|bracket| year >= bracket.min_year) {
                notes.extend(bracket.notes.iter().map(|note| note.to_string()));
            }
        }

        notes
    }
}

/// Knowledge-base procedure for `brand`, falling back to the generic template.
pub fn offline_procedure(
    brand: &str,
    model: Option<&str>,
    year: Option<i32>,
    fetched_at: DateTime<Utc>,
) -> CalibrationProcedure {
    let (entry, brand_label) = match brand_procedure(brand) {
        Some(entry) => (entry, entry.brand.to_string()),
        None => (&GENERIC, brand.trim().to_uppercase()),
    };

    CalibrationProcedure {
        title: format!("{brand_label} ADAS calibration"),
        brand: brand_label,
        source: entry.source.to_string(),
        calibration_types: to_strings(entry.calibration_types),
        steps: to_strings(entry.steps),
        requirements: to_strings(entry.requirements),
        warnings: to_strings(entry.warnings),
        estimated_duration: entry.duration,
        equipment: to_strings(entry.equipment),
        model_notes: entry.model_notes_for(model, year),
        fetched_at,
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}
