//! Request document builders.

use super::escape;
use crate::types::*;

const XML_DECL: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";
const S3_NS: &str = "http://s3.amazonaws.com/doc/2006-03-01/";

/// Build the DeleteObjects request body.
///
/// Quiet mode is never requested: every key must be reported back.
pub fn build_delete_objects_xml(objects: &[ObjectIdentifier]) -> String {
    let mut xml = String::from(XML_DECL);
    xml.push_str("<Delete>");
    for obj in objects {
        xml.push_str("<Object>");
        xml.push_str(&format!("<Key>{}</Key>", escape(&obj.key)));
        if let Some(version_id) = &obj.version_id {
            xml.push_str(&format!("<VersionId>{}</VersionId>", escape(version_id)));
        }
        xml.push_str("</Object>");
    }
    xml.push_str("</Delete>");
    xml
}

/// Build the CompleteMultipartUpload request body.
///
/// Parts are emitted in ascending part-number order.
pub fn build_complete_multipart_xml(parts: &[CompletedPart]) -> String {
    let mut sorted: Vec<&CompletedPart> = parts.iter().collect();
    sorted.sort_by_key(|p| p.part_number);

    let mut xml = String::from(XML_DECL);
    xml.push_str("<CompleteMultipartUpload>");
    for part in sorted {
        xml.push_str("<Part>");
        xml.push_str(&format!("<PartNumber>{}</PartNumber>", part.part_number));
        xml.push_str(&format!("<ETag>{}</ETag>", escape(&part.e_tag)));
        xml.push_str("</Part>");
    }
    xml.push_str("</CompleteMultipartUpload>");
    xml
}

/// Build the CreateBucket request body.
pub fn build_create_bucket_xml(location: &str) -> String {
    format!(
        r#"{}<CreateBucketConfiguration xmlns="{}"><LocationConstraint>{}</LocationConstraint></CreateBucketConfiguration>"#,
        XML_DECL,
        S3_NS,
        escape(location)
    )
}

fn owner_xml(owner: &Owner) -> String {
    let mut xml = String::from("<Owner>");
    if let Some(id) = &owner.id {
        xml.push_str(&format!("<ID>{}</ID>", escape(id)));
    }
    if let Some(name) = &owner.display_name {
        xml.push_str(&format!("<DisplayName>{}</DisplayName>", escape(name)));
    }
    xml.push_str("</Owner>");
    xml
}

fn grantee_xml(grantee: &Grantee) -> String {
    let mut xml = format!(
        r#"<Grantee xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:type="{}">"#,
        grantee.type_name()
    );
    match grantee {
        Grantee::CanonicalUser { id, display_name } => {
            xml.push_str(&format!("<ID>{}</ID>", escape(id)));
            if let Some(name) = display_name {
                xml.push_str(&format!("<DisplayName>{}</DisplayName>", escape(name)));
            }
        }
        Grantee::Group { uri } => xml.push_str(&format!("<URI>{}</URI>", escape(uri))),
        Grantee::Email { address } => {
            xml.push_str(&format!("<EmailAddress>{}</EmailAddress>", escape(address)))
        }
    }
    xml.push_str("</Grantee>");
    xml
}

/// Build an AccessControlPolicy request body.
pub fn build_acl_xml(acl: &AccessControlList) -> String {
    let mut xml = String::from(XML_DECL);
    xml.push_str(&format!(r#"<AccessControlPolicy xmlns="{}">"#, S3_NS));
    xml.push_str(&owner_xml(&acl.owner));
    xml.push_str("<AccessControlList>");
    for grant in &acl.grants {
        xml.push_str("<Grant>");
        xml.push_str(&grantee_xml(&grant.grantee));
        xml.push_str(&format!(
            "<Permission>{}</Permission>",
            grant.permission.as_str()
        ));
        xml.push_str("</Grant>");
    }
    xml.push_str("</AccessControlList></AccessControlPolicy>");
    xml
}

/// Build a VersioningConfiguration request body.
pub fn build_versioning_xml(status: VersioningStatus) -> String {
    format!(
        r#"{}<VersioningConfiguration xmlns="{}"><Status>{}</Status></VersioningConfiguration>"#,
        XML_DECL,
        S3_NS,
        status.as_str()
    )
}

/// Build a CORSConfiguration request body.
pub fn build_cors_xml(config: &CorsConfiguration) -> String {
    let mut xml = String::from(XML_DECL);
    xml.push_str("<CORSConfiguration>");
    for rule in &config.rules {
        xml.push_str("<CORSRule>");
        if let Some(id) = &rule.id {
            xml.push_str(&format!("<ID>{}</ID>", escape(id)));
        }
        for origin in &rule.allowed_origins {
            xml.push_str(&format!("<AllowedOrigin>{}</AllowedOrigin>", escape(origin)));
        }
        for method in &rule.allowed_methods {
            xml.push_str(&format!("<AllowedMethod>{}</AllowedMethod>", method.as_str()));
        }
        for header in &rule.allowed_headers {
            xml.push_str(&format!("<AllowedHeader>{}</AllowedHeader>", escape(header)));
        }
        for header in &rule.expose_headers {
            xml.push_str(&format!("<ExposeHeader>{}</ExposeHeader>", escape(header)));
        }
        if let Some(max_age) = rule.max_age_seconds {
            xml.push_str(&format!("<MaxAgeSeconds>{}</MaxAgeSeconds>", max_age));
        }
        xml.push_str("</CORSRule>");
    }
    xml.push_str("</CORSConfiguration>");
    xml
}

/// Build a LifecycleConfiguration request body.
pub fn build_lifecycle_xml(config: &LifecycleConfiguration) -> String {
    let mut xml = String::from(XML_DECL);
    xml.push_str("<LifecycleConfiguration>");
    for rule in &config.rules {
        xml.push_str("<Rule>");
        if let Some(id) = &rule.id {
            xml.push_str(&format!("<ID>{}</ID>", escape(id)));
        }
        xml.push_str(&format!("<Prefix>{}</Prefix>", escape(&rule.prefix)));
        xml.push_str(&format!("<Status>{}</Status>", rule.status.as_str()));
        match &rule.expiration {
            Some(LifecycleExpiration::Days(days)) => {
                xml.push_str(&format!("<Expiration><Days>{}</Days></Expiration>", days))
            }
            Some(LifecycleExpiration::Date(date)) => xml.push_str(&format!(
                "<Expiration><Date>{}</Date></Expiration>",
                escape(date)
            )),
            None => {}
        }
        if let Some(days) = rule.noncurrent_version_expiration_days {
            xml.push_str(&format!(
                "<NoncurrentVersionExpiration><NoncurrentDays>{}</NoncurrentDays></NoncurrentVersionExpiration>",
                days
            ));
        }
        if let Some(days) = rule.abort_incomplete_multipart_days {
            xml.push_str(&format!(
                "<AbortIncompleteMultipartUpload><DaysAfterInitiation>{}</DaysAfterInitiation></AbortIncompleteMultipartUpload>",
                days
            ));
        }
        xml.push_str("</Rule>");
    }
    xml.push_str("</LifecycleConfiguration>");
    xml
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_objects_xml_is_never_quiet() {
        let xml = build_delete_objects_xml(&[
            ObjectIdentifier::new("a&b"),
            ObjectIdentifier::with_version("c", "v1"),
        ]);
        assert!(!xml.contains("<Quiet>"));
        assert!(xml.contains("<Object><Key>a&amp;b</Key></Object>"));
        assert!(xml.contains("<Object><Key>c</Key><VersionId>v1</VersionId></Object>"));
    }

    #[test]
    fn test_complete_multipart_xml_sorts_parts() {
        let parts = vec![
            CompletedPart { part_number: 3, e_tag: "\"c\"".into() },
            CompletedPart { part_number: 1, e_tag: "\"a\"".into() },
            CompletedPart { part_number: 2, e_tag: "\"b\"".into() },
        ];
        let xml = build_complete_multipart_xml(&parts);
        let one = xml.find("<PartNumber>1<").unwrap();
        let two = xml.find("<PartNumber>2<").unwrap();
        let three = xml.find("<PartNumber>3<").unwrap();
        assert!(one < two && two < three);
        assert!(xml.contains("<ETag>&quot;a&quot;</ETag>"));
    }

    #[test]
    fn test_acl_xml() {
        let acl = AccessControlList::new(Owner {
            id: Some("owner-id".into()),
            display_name: None,
        })
        .with_grant(Grantee::user("owner-id"), Permission::FullControl)
        .with_grant(Grantee::all_users(), Permission::Read);

        let xml = build_acl_xml(&acl);
        assert!(xml.contains("<Owner><ID>owner-id</ID></Owner>"));
        assert!(xml.contains(r#"xsi:type="CanonicalUser"><ID>owner-id</ID></Grantee><Permission>FULL_CONTROL</Permission>"#));
        assert!(xml.contains(r#"xsi:type="Group"><URI>http://acs.amazonaws.com/groups/global/AllUsers</URI>"#));
    }

    #[test]
    fn test_lifecycle_xml() {
        let config = LifecycleConfiguration {
            rules: vec![LifecycleRule::expire_after("logs/", 30)
                .with_id("expire-logs")
                .with_abort_incomplete_multipart(7)],
        };
        let xml = build_lifecycle_xml(&config);
        assert!(xml.contains("<ID>expire-logs</ID><Prefix>logs/</Prefix><Status>Enabled</Status>"));
        assert!(xml.contains("<Expiration><Days>30</Days></Expiration>"));
        assert!(xml.contains("<DaysAfterInitiation>7</DaysAfterInitiation>"));
    }

    #[test]
    fn test_cors_and_versioning_xml() {
        let cors = CorsConfiguration {
            rules: vec![CorsRule::new("*", [CorsMethod::Get, CorsMethod::Put]).with_max_age(300)],
        };
        let xml = build_cors_xml(&cors);
        assert!(xml.contains("<AllowedOrigin>*</AllowedOrigin><AllowedMethod>GET</AllowedMethod><AllowedMethod>PUT</AllowedMethod>"));
        assert!(xml.contains("<MaxAgeSeconds>300</MaxAgeSeconds>"));

        assert!(build_versioning_xml(VersioningStatus::Suspended).contains("<Status>Suspended</Status>"));
    }
}
