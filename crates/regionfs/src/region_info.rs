use crate::RegionFsError;

/// The persisted descriptor for a region: identity plus the row-range it
/// owns. Round-trips through `.regioninfo` as a small line-based text
/// format so an operator can read it with any text editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionInfo {
    pub namespace: String,
    pub table: String,
    pub region_encoded_name: String,
    pub region_id: u64,
    pub start_key: Vec<u8>,
    pub end_key: Vec<u8>,
}

impl RegionInfo {
    pub(crate) fn encode(&self) -> Vec<u8> {
        let mut out = String::new();
        out.push_str(&format!("namespace:{}\n", self.namespace));
        out.push_str(&format!("table:{}\n", self.table));
        out.push_str(&format!("region:{}\n", self.region_encoded_name));
        out.push_str(&format!("regionId:{}\n", self.region_id));
        out.push_str(&format!("startKey:{}\n", hex::encode(&self.start_key)));
        out.push_str(&format!("endKey:{}\n", hex::encode(&self.end_key)));
        out.into_bytes()
    }

    pub(crate) fn decode(bytes: &[u8]) -> Result<Self, RegionFsError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| RegionFsError::CorruptRegionInfo("not valid utf-8".into()))?;

        let mut namespace = None;
        let mut table = None;
        let mut region_encoded_name = None;
        let mut region_id = None;
        let mut start_key = None;
        let mut end_key = None;

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (key, value) = line
                .split_once(':')
                .ok_or_else(|| RegionFsError::CorruptRegionInfo(format!("malformed line: {line}")))?;
            match key {
                "namespace" => namespace = Some(value.to_string()),
                "table" => table = Some(value.to_string()),
                "region" => region_encoded_name = Some(value.to_string()),
                "regionId" => {
                    region_id = Some(value.parse::<u64>().map_err(|_| {
                        RegionFsError::CorruptRegionInfo(format!("bad regionId: {value}"))
                    })?)
                }
                "startKey" => {
                    start_key = Some(hex::decode(value).map_err(|_| {
                        RegionFsError::CorruptRegionInfo("bad startKey hex".into())
                    })?)
                }
                "endKey" => {
                    end_key = Some(hex::decode(value).map_err(|_| {
                        RegionFsError::CorruptRegionInfo("bad endKey hex".into())
                    })?)
                }
                other => {
                    return Err(RegionFsError::CorruptRegionInfo(format!("unknown field: {other}")))
                }
            }
        }

        Ok(Self {
            namespace: namespace.ok_or_else(|| RegionFsError::CorruptRegionInfo("missing namespace".into()))?,
            table: table.ok_or_else(|| RegionFsError::CorruptRegionInfo("missing table".into()))?,
            region_encoded_name: region_encoded_name
                .ok_or_else(|| RegionFsError::CorruptRegionInfo("missing region".into()))?,
            region_id: region_id.ok_or_else(|| RegionFsError::CorruptRegionInfo("missing regionId".into()))?,
            start_key: start_key.unwrap_or_default(),
            end_key: end_key.unwrap_or_default(),
        })
    }
}
