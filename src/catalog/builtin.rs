use super::{ParamKind, ParamValue, ParameterCatalog, ParameterDefinition};

/// Order in which `main.nf` of nf-core/crisprseq receives its flags.
pub const CRISPRSEQ_INVOCATION_ORDER: &[&str] = &[
    "input",
    "outdir",
    "analysis",
    "email",
    "multiqc_title",
    "overrepresented",
    "umi_clustering",
    "umi_bin_size",
    "medaka_model",
    "aligner",
    "protospacer",
    "vsearch_minseqlength",
    "vsearch_maxseqlength",
    "vsearch_id",
    "mle_design_matrix",
    "rra_contrasts",
    "count_table",
    "library",
    "crisprcleanr",
    "cutadapt",
    "min_reads",
    "min_targeted_genes",
    "bagel_reference_essentials",
    "bagel_reference_nonessentials",
    "genome",
    "reference_fasta",
    "multiqc_methods_description",
];

struct Entry {
    name: &'static str,
    kind: ParamKind,
    optional: bool,
    output: bool,
    default: Option<ParamValue>,
    section_title: Option<&'static str>,
    description: &'static str,
}

fn optional(name: &'static str, kind: ParamKind, description: &'static str) -> Entry {
    Entry {
        name,
        kind,
        optional: true,
        output: false,
        default: None,
        section_title: None,
        description,
    }
}

impl Entry {
    fn default(mut self, value: impl Into<ParamValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    fn section(mut self, title: &'static str) -> Self {
        self.section_title = Some(title);
        self
    }

    fn required(mut self) -> Self {
        self.optional = false;
        self
    }

    fn output(mut self) -> Self {
        self.output = true;
        self.optional = false;
        self
    }

    fn build(self) -> ParameterDefinition {
        ParameterDefinition {
            name: self.name.to_string(),
            kind: self.kind,
            optional: self.optional,
            output: self.output,
            default: self.default,
            section_title: self.section_title.map(str::to_string),
            description: self.description.to_string(),
        }
    }
}

pub fn crisprseq_catalog() -> ParameterCatalog {
    use ParamKind as K;

    let entries = vec![
        optional(
            "input",
            K::File,
            "Path to comma-separated file containing information about the samples in the experiment.",
        )
        .section("Input/output options"),
        optional(
            "outdir",
            K::Directory,
            "The output directory where the results will be saved. You have to use absolute paths to storage on Cloud infrastructure.",
        )
        .output(),
        optional(
            "analysis",
            K::String,
            "Type of analysis to perform. Targeted for targeted CRISPR experiments and screening for CRISPR screening experiments.",
        )
        .required(),
        optional("email", K::String, "Email address for completion summary."),
        optional(
            "multiqc_title",
            K::String,
            "MultiQC report title. Printed as page header, used for filename if not otherwise specified.",
        ),
        optional(
            "overrepresented",
            K::Boolean,
            "Trim overrepresented sequences from reads (cutadapt)",
        )
        .section("targeted pipeline steps"),
        optional(
            "umi_clustering",
            K::Boolean,
            "If the sample contains umi-molecular identifyers (UMIs), run the UMI extraction, clustering and consensus steps.",
        ),
        optional("umi_bin_size", K::Integer, "Minimum size of a UMI cluster.")
            .default(1_i64)
            .section("UMI parameters"),
        optional(
            "medaka_model",
            K::String,
            "Medaka model (-m) to use according to the basecaller used.",
        )
        .default("r941_min_high_g360"),
        optional("aligner", K::String, "Aligner program to use.")
            .default("minimap2")
            .section("Targeted parameters"),
        optional(
            "protospacer",
            K::String,
            "Provide the same protospacer sequence for all samples. Will override protospacer sequences provided by an input samplesheet.",
        ),
        optional(
            "vsearch_minseqlength",
            K::Integer,
            "Vsearch minimum sequence length.",
        )
        .default(55_i64)
        .section("Vsearch parameters"),
        optional(
            "vsearch_maxseqlength",
            K::Integer,
            "Vsearch maximum sequence length.",
        )
        .default(57_i64),
        optional("vsearch_id", K::Float, "Vsearch pairwise identity threshold.").default(0.99),
        optional(
            "mle_design_matrix",
            K::File,
            "Design matrix used for MAGeCK MLE to call essential genes under multiple conditions while considering sgRNA knockout efficiency",
        )
        .section("Screening parameters"),
        optional(
            "rra_contrasts",
            K::File,
            "Comma-separated file with the conditions to be compared. The first one will be the reference (control)",
        ),
        optional(
            "count_table",
            K::File,
            "Please provide your count table if the mageck test should be skipped.",
        ),
        optional("library", K::File, "sgRNA and targetting genes, tab separated"),
        optional(
            "crisprcleanr",
            K::String,
            "sgRNA library annotation for crisprcleanR",
        ),
        optional("cutadapt", K::String, "cut adapter for screening analysis"),
        optional(
            "min_reads",
            K::Float,
            "a filter threshold value for sgRNAs, based on their average counts in the control sample",
        )
        .default(30.0),
        optional(
            "min_targeted_genes",
            K::Float,
            "Minimal number of different genes targeted by sgRNAs in a biased segment in order for the corresponding counts to be corrected for CRISPRcleanR",
        )
        .default(3.0),
        optional(
            "bagel_reference_essentials",
            K::String,
            "Core essential gene set for BAGEL2",
        )
        .default("https://raw.githubusercontent.com/hart-lab/bagel/master/CEGv2.txt"),
        optional(
            "bagel_reference_nonessentials",
            K::String,
            "Non essential gene set  for BAGEL2",
        )
        .default("https://raw.githubusercontent.com/hart-lab/bagel/master/NEGv1.txt"),
        optional("genome", K::String, "Name of iGenomes reference.")
            .section("Reference genome options"),
        optional(
            "reference_fasta",
            K::File,
            "Path to the reference FASTA file. Will override reference sequences provided by an input sample sheet.",
        ),
        optional(
            "multiqc_methods_description",
            K::File,
            "Custom MultiQC yaml file containing HTML including a methods description.",
        )
        .section("Generic options"),
    ];

    ParameterCatalog {
        parameters: entries.into_iter().map(Entry::build).collect(),
        invocation_order: Some(
            CRISPRSEQ_INVOCATION_ORDER
                .iter()
                .map(|name| name.to_string())
                .collect(),
        ),
    }
}
