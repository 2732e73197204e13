//! Normalization of free-text labels typed by humans.

/// Uppercase, strip Portuguese diacritics, treat `_`/`-` as spaces and
/// collapse whitespace. `"  Em_Análise "` becomes `"EM ANALISE"`.
pub fn normalizar(s: &str) -> String {
    let folded: String = s
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' | 'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'A',
            'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => 'E',
            'í' | 'ì' | 'î' | 'ï' | 'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' | 'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
            'ú' | 'ù' | 'û' | 'ü' | 'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
            'ç' | 'Ç' => 'C',
            '_' | '-' => ' ',
            other => other.to_ascii_uppercase(),
        })
        .collect();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Case- and accent-insensitive equality.
pub fn iguais(a: &str, b: &str) -> bool {
    normalizar(a) == normalizar(b)
}
