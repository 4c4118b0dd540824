//! The closed set of regions (departments of Uruguay) the view is keyed on.

use serde::Serialize;
use std::fmt;

/// One of the 19 departments of Uruguay.
///
/// Every source spells region names its own way (upper case, missing accents,
/// stray whitespace). [`Region::from_name`] folds those spellings onto the
/// canonical name returned by [`Region::name`], and rejects anything that is
/// not one of the 19 departments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Region {
    Artigas,
    Canelones,
    CerroLargo,
    Colonia,
    Durazno,
    Flores,
    Florida,
    Lavalleja,
    Maldonado,
    Montevideo,
    Paysandu,
    RioNegro,
    Rivera,
    Rocha,
    Salto,
    SanJose,
    Soriano,
    Tacuarembo,
    TreintaYTres,
}

impl Region {
    pub const ALL: [Region; 19] = [
        Region::Artigas,
        Region::Canelones,
        Region::CerroLargo,
        Region::Colonia,
        Region::Durazno,
        Region::Flores,
        Region::Florida,
        Region::Lavalleja,
        Region::Maldonado,
        Region::Montevideo,
        Region::Paysandu,
        Region::RioNegro,
        Region::Rivera,
        Region::Rocha,
        Region::Salto,
        Region::SanJose,
        Region::Soriano,
        Region::Tacuarembo,
        Region::TreintaYTres,
    ];

    /// The canonical spelling written to the `region` column.
    pub fn name(&self) -> &'static str {
        match self {
            Region::Artigas => "Artigas",
            Region::Canelones => "Canelones",
            Region::CerroLargo => "Cerro Largo",
            Region::Colonia => "Colonia",
            Region::Durazno => "Durazno",
            Region::Flores => "Flores",
            Region::Florida => "Florida",
            Region::Lavalleja => "Lavalleja",
            Region::Maldonado => "Maldonado",
            Region::Montevideo => "Montevideo",
            Region::Paysandu => "Paysandú",
            Region::RioNegro => "Río Negro",
            Region::Rivera => "Rivera",
            Region::Rocha => "Rocha",
            Region::Salto => "Salto",
            Region::SanJose => "San José",
            Region::Soriano => "Soriano",
            Region::Tacuarembo => "Tacuarembó",
            Region::TreintaYTres => "Treinta y Tres",
        }
    }

    /// Resolves a free-form department name, ignoring case, accents and
    /// surrounding or repeated whitespace.
    ///
    /// ```
    /// use agroview::Region;
    ///
    /// assert_eq!(Region::from_name("PAYSANDU"), Some(Region::Paysandu));
    /// assert_eq!(Region::from_name(" treinta  y tres "), Some(Region::TreintaYTres));
    /// assert_eq!(Region::from_name("Buenos Aires"), None);
    /// ```
    pub fn from_name(name: &str) -> Option<Self> {
        let key = fold(name);
        Self::ALL.into_iter().find(|region| fold(region.name()) == key)
    }

    /// Returns `true` when `name` is exactly one of the canonical spellings.
    pub fn is_canonical(name: &str) -> bool {
        Self::ALL.iter().any(|region| region.name() == name)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn fold(name: &str) -> String {
    let folded: String = name
        .chars()
        .map(|c| match c {
            'á' | 'Á' => 'a',
            'é' | 'É' => 'e',
            'í' | 'Í' => 'i',
            'ó' | 'Ó' => 'o',
            'ú' | 'Ú' | 'ü' | 'Ü' => 'u',
            'ñ' | 'Ñ' => 'n',
            other => other.to_ascii_lowercase(),
        })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}
