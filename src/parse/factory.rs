use crate::parse::grammar::GrammarRegistry;
use crate::parse::java::JavaAnalyzer;
use crate::parse::nodejs::NodeAnalyzer;
use crate::parse::python::PythonAnalyzer;
use crate::parse::EndpointAnalyzer;
use crate::walk::Language;

/// Create the EndpointAnalyzer for a language.
pub fn create_analyzer(lang: Language, registry: &GrammarRegistry) -> Box<dyn EndpointAnalyzer + '_> {
    match lang {
        Language::Python => Box::new(PythonAnalyzer::new(registry)),
        Language::Java => Box::new(JavaAnalyzer::new(registry)),
        Language::JavaScript | Language::TypeScript | Language::Tsx => {
            Box::new(NodeAnalyzer::new(registry, lang))
        }
    }
}
